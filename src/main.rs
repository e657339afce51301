use std::error::Error;

use ai_llm_service::telemetry;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; variables may come from the process environment.
    let dotenv = dotenvy::dotenv();

    telemetry::init(telemetry::DEFAULT_FILTER)?;

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!("no .env file, using process environment"),
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = api::start().await {
        error!(error = %e, "Quick Catch API terminated");
        return Err(e.into());
    }

    Ok(())
}
