use loralink_signals::{SignalDatabase, TelemetryDecoder};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{load_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = parse_hex(&args.payload)?;
    let database = SignalDatabase::load(&args.database).map_err(|err| {
        load_error(
            &format!("failed loading {}", args.database.display()),
            err,
        )
    })?;

    let decoded = TelemetryDecoder::new(database).decode_payload(&payload);
    print_decoded(&decoded, format);

    if decoded.is_ok() {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}
