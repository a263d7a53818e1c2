mod ai;
mod cli;
mod config;
mod error;
mod gitlab;
mod metrics;
mod output;
mod review;
mod server;
mod template;
mod tools;
mod util;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
