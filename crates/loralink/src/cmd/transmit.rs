use std::fs;

use loralink_session::SessionConfig;

use crate::cmd::{parse_hex, TransmitArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_transmitted, OutputFormat};

pub fn run(args: TransmitArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let mut session = args.connect.open(SessionConfig::default())?;

    session
        .send_transmission(&payload)
        .map_err(|err| session_error("transmit failed", err))?;
    print_transmitted(payload.len(), session.stats(), format);

    Ok(SUCCESS)
}

fn resolve_payload(args: &TransmitArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(
        USAGE,
        "one of --data, --hex or --file is required",
    ))
}
