use clap::Parser;
use tracing::error;

use duplicity_wrapper::cli::{self, Cli};
use duplicity_wrapper::logging::init_logging;
use duplicity_wrapper::DuplicityError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli::run(cli).await {
        let code = match e.downcast_ref::<DuplicityError>() {
            Some(err) => {
                error!("{}", err);
                eprintln!("Error: {}", err.user_message());
                err.exit_code()
            }
            None => {
                error!("{:#}", e);
                eprintln!("Error: {:#}", e);
                1
            }
        };
        std::process::exit(code);
    }
}
