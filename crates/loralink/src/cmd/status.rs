use loralink_session::SessionConfig;

use crate::cmd::{parse_duration, request_status, status_code, StatusArgs};
use crate::exit::CliResult;
use crate::output::{print_status, OutputFormat};

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut session = args.connect.open(SessionConfig::default())?;

    let report = request_status(&mut session, timeout)?;
    print_status(&report, format);

    Ok(status_code(&report))
}
