use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use orderkit::backend::{mock::MockStore, Backend};
use orderkit::config::ServerArgs;
use orderkit::errors::Result;
use orderkit::http::HttpServer;
use orderkit::logging;

fn run(args: ServerArgs) -> Result<()> {
    let config = args.into_config()?;
    let backend = Arc::new(Backend::new(Arc::new(MockStore::new()))?);
    let server = HttpServer::new(&config.address)?;

    info!("Serving the menu on http://{}", server.local_addr()?);
    server.serve(move |request| backend.handle(request));
    Ok(())
}

fn main() -> ExitCode {
    logging::init("info");
    match run(ServerArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
