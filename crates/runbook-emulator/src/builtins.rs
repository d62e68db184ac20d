//! The fixed command vocabulary every emulator starts with.

use crate::emulator::{Handler, ShellState};
use crate::fs::{Node, normalize};
use std::collections::HashMap;

const UNAME_ALL: &str = "Linux ubuntu-server 5.15.0-92-generic #102-Ubuntu SMP Wed Jan 10 09:33:48 UTC 2024 x86_64 x86_64 x86_64 GNU/Linux";
const KERNEL_VERSION: &str = "#102-Ubuntu SMP Wed Jan 10 09:33:48 UTC 2024";

pub(crate) fn register(handlers: &mut HashMap<String, Handler>) {
    let builtins: [(&str, Handler); 8] = [
        ("pwd", Box::new(pwd)),
        ("cd", Box::new(cd)),
        ("ls", Box::new(ls)),
        ("git pull", Box::new(git_pull)),
        ("reboot", Box::new(reboot)),
        ("sudo", Box::new(sudo)),
        ("uname", Box::new(uname)),
        ("whoami", Box::new(whoami)),
    ];
    for (name, handler) in builtins {
        handlers.insert(name.to_string(), handler);
    }
}

fn pwd(shell: &mut ShellState, _args: &str) -> String {
    shell.cwd().to_string()
}

/// Resolve an operand the way the shell does: `~` and `~/..` expand to the
/// home directory, everything else is taken relative to the cwd.
fn resolve(shell: &ShellState, operand: &str) -> String {
    let expanded = if operand == "~" {
        shell.home().to_string()
    } else if let Some(rest) = operand.strip_prefix("~/") {
        format!("{}/{rest}", shell.home())
    } else {
        operand.to_string()
    };
    normalize(shell.cwd(), &expanded)
}

fn cd(shell: &mut ShellState, args: &str) -> String {
    let target = args.trim();
    let path = if target.is_empty() {
        shell.home().to_string()
    } else {
        resolve(shell, target)
    };
    match shell.fs.lookup(&path).map(Node::is_dir) {
        Some(true) => {
            shell.set_cwd(path);
            String::new()
        }
        Some(false) => format!("bash: cd: {target}: Not a directory"),
        None => format!("bash: cd: {target}: No such file or directory"),
    }
}

fn ls(shell: &mut ShellState, args: &str) -> String {
    let mut show_hidden = false;
    let mut operand = None;
    for token in args.split_whitespace() {
        match token.strip_prefix('-') {
            Some(flags) => show_hidden |= flags.contains('a'),
            None if operand.is_none() => operand = Some(token),
            None => {}
        }
    }

    let path = match operand {
        Some(p) => resolve(shell, p),
        None => shell.cwd().to_string(),
    };
    let display = operand.unwrap_or(".");

    match shell.fs.lookup(&path) {
        None => format!("ls: cannot access '{display}': No such file or directory"),
        Some(node) if !node.is_dir() => display.to_string(),
        Some(_) => {
            // `list` yields names in sorted order.
            let names = shell.fs.list(&path).unwrap_or_default();
            names
                .into_iter()
                .filter(|name| show_hidden || !name.starts_with('.'))
                .collect::<Vec<_>>()
                .join("  ")
        }
    }
}

fn git_pull(_shell: &mut ShellState, _args: &str) -> String {
    "Already up to date.".into()
}

fn reboot(_shell: &mut ShellState, _args: &str) -> String {
    "Operation not permitted, must be run with sudo to work".into()
}

fn sudo(_shell: &mut ShellState, args: &str) -> String {
    match args.split_whitespace().next() {
        None => "Usage: sudo command [arguments]".into(),
        Some("reboot") => "System is rebooting...".into(),
        Some(cmd) => format!("sudo: command not found: {cmd}"),
    }
}

fn uname(_shell: &mut ShellState, args: &str) -> String {
    match args.trim() {
        "-a" => UNAME_ALL.into(),
        "" | "-s" => "Linux".into(),
        "-n" => "ubuntu-server".into(),
        "-r" => "5.15.0-92-generic".into(),
        "-v" => KERNEL_VERSION.into(),
        "-m" | "-p" | "-i" => "x86_64".into(),
        "-o" => "GNU/Linux".into(),
        other => format!(
            "uname: invalid option -- '{other}'\nTry 'uname --help' for more information."
        ),
    }
}

fn whoami(shell: &mut ShellState, _args: &str) -> String {
    shell.user().to_string()
}
