use std::io::Write;

use console::style;
use tokio::io::AsyncBufReadExt;

use runbook_core::Result;
use runbook_emulator::UnixEmulator;
use runbook_emulator::emulator::DEFAULT_USER;

/// Interactive session against the shell emulator. State persists until
/// the session ends.
pub(super) async fn cmd_emulate() -> Result<()> {
    let mut emulator = UnixEmulator::new();
    println!("Runbook shell emulator. Type 'exit' to leave.\n");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();

    loop {
        print!(
            "{}:{}$ ",
            style(format!("{DEFAULT_USER}@ubuntu-server")).green().bold(),
            style(emulator.cwd()).blue().bold()
        );
        std::io::stdout().flush().ok();

        let Ok(Some(line)) = lines.next_line().await else {
            println!();
            break;
        };
        let command = line.trim();
        if command == "exit" || command == "logout" {
            break;
        }

        let output = emulator.execute(command);
        if !output.is_empty() {
            println!("{output}");
        }
    }
    Ok(())
}
