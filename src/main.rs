use std::process::ExitCode;

// Titles and files are processed strictly one after another.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    gamevault_importer::run().await
}
