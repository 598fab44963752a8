use poise::Command;

use crate::{Data, Error};

mod manage;
mod voice;

pub fn build_commands() -> Vec<Command<Data, Error>> {
    vec![voice::vc(), manage::vmsetup(), manage::vmreset()]
}
