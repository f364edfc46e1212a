use loralink_packet::DeviceState;
use loralink_session::SessionConfig;

use crate::cmd::StateArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_state_changed, OutputFormat};

pub fn run(args: StateArgs, format: OutputFormat) -> CliResult<i32> {
    let state = DeviceState::from(args.state);
    let mut session = args.connect.open(SessionConfig::default())?;

    session
        .change_state(state)
        .map_err(|err| session_error("state change failed", err))?;
    print_state_changed(state, session.stats(), format);

    Ok(SUCCESS)
}
