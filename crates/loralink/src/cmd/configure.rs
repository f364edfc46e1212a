use loralink_session::SessionConfig;
use tracing::info;

use crate::cmd::{parse_duration, request_status, status_code, ConfigureArgs};
use crate::exit::{session_error, CliResult};
use crate::output::{print_status, OutputFormat};

pub fn run(args: ConfigureArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let settings = args.settings();
    let mut session = args.connect.open(SessionConfig::default())?;

    info!(?settings, "applying settings");
    session
        .apply_settings(settings)
        .map_err(|err| session_error("apply settings failed", err))?;

    let report = request_status(&mut session, timeout)?;
    print_status(&report, format);

    Ok(status_code(&report))
}
