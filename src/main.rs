use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tailpost::app::main().await
}
