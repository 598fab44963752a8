use std::{env, error::Error};

use git2::Repository;

// Bakes the current commit into the binary for the sentry release string.
// Builds from a plain source tarball just leave BUILD_COMMIT unset.
fn current_commit() -> Result<String, Box<dyn Error>> {
    let repo = Repository::open(env::var("CARGO_MANIFEST_DIR")?)?;
    let commit = repo.head()?.peel_to_commit()?.id().to_string();
    Ok(commit)
}

fn main() {
    if let Ok(hash) = current_commit() {
        println!("cargo::rustc-env=BUILD_COMMIT={}", hash);
    }
}
