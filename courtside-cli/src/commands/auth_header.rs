//! Auth-header command - print the Authorization value for an endpoint.

use courtside_push::WebPushConfig;

use crate::error::CliResult;

/// Print the `Authorization` header value for a push endpoint.
pub fn run(config: &WebPushConfig, endpoint: &str) -> CliResult<()> {
    let authenticator = config.authenticator()?;
    println!("{}", authenticator.build_auth_header(endpoint)?);
    Ok(())
}
