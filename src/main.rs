use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use procwatch::commands;

fn session_args() -> Vec<Arg> {
    vec![
        Arg::new("interval")
            .short('i')
            .long("interval")
            .value_name("SECONDS")
            .help("Seconds between samples")
            .value_parser(clap::value_parser!(f64)),
        Arg::new("history")
            .long("history")
            .value_name("POINTS")
            .help("Points kept per history series")
            .value_parser(clap::value_parser!(usize)),
        Arg::new("timeout-ms")
            .long("timeout-ms")
            .value_name("MS")
            .help("Upper bound for a single OS query")
            .value_parser(clap::value_parser!(u64)),
        Arg::new("max-timeouts")
            .long("max-timeouts")
            .value_name("N")
            .help("Consecutive timed out cycles before the session fails")
            .value_parser(clap::value_parser!(u32)),
        Arg::new("disk")
            .long("disk")
            .value_name("PATH")
            .help("Path whose filesystem is shown in host metrics"),
        Arg::new("bar-width")
            .long("bar-width")
            .value_name("CELLS")
            .help("Width of the usage bars")
            .value_parser(clap::value_parser!(usize)),
        Arg::new("json")
            .long("json")
            .help("Print one JSON sample per line instead of the dashboard")
            .action(ArgAction::SetTrue),
        Arg::new("cycles")
            .short('n')
            .long("cycles")
            .value_name("N")
            .help("Stop after N sampling cycles")
            .value_parser(clap::value_parser!(u64)),
        Arg::new("log-file")
            .long("log-file")
            .value_name("FILE")
            .help("Append log records to FILE")
            .value_parser(clap::value_parser!(PathBuf)),
        Arg::new("keep-alive")
            .long("keep-alive")
            .help("Leave the target running when the session stops")
            .action(ArgAction::SetTrue),
    ]
}

fn build_cli() -> Command {
    Command::new("procwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Profile a single process: CPU, memory, I/O, threads and process tree")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about("Launch a program and profile it")
                .arg(
                    Arg::new("program")
                        .help("Executable to launch")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .index(1),
                )
                .arg(
                    Arg::new("args")
                        .help("Arguments passed to the program")
                        .num_args(0..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .index(2),
                )
                .args(session_args()),
        )
        .subcommand(
            Command::new("attach")
                .about("Profile an already running process")
                .arg(
                    Arg::new("pid")
                        .help("Process id")
                        .required(true)
                        .value_parser(clap::value_parser!(u32))
                        .index(1),
                )
                .args(session_args())
                .arg(
                    Arg::new("terminate")
                        .long("terminate")
                        .help("Terminate the process when the session ends")
                        .conflicts_with("keep-alive")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or create the configuration file")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(
                    Command::new("init")
                        .about("Write a config file with default values")
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .help("Overwrite an existing file")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .help("bash, zsh, fish, powershell or elvish")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(Command::new("version").about("Shows version information"))
}

/// Dashboard sessions log only to a file; everything else logs to stderr.
fn setup_logging(matches: &ArgMatches) -> Result<()> {
    let session = match matches.subcommand() {
        Some(("run", sub)) | Some(("attach", sub)) => Some(sub),
        _ => None,
    };

    let (level, log_file) = match session {
        Some(sub) => {
            let log_file = sub.get_one::<PathBuf>("log-file");
            let level = if sub.get_flag("json") || log_file.is_some() {
                LevelFilter::Info
            } else {
                LevelFilter::Off
            };
            (level, log_file)
        }
        None => (LevelFilter::Warn, None),
    };

    procwatch::init_logging(level, log_file.map(|p| p.as_path()))?;
    Ok(())
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    if matches.get_flag("version") {
        return commands::version();
    }

    setup_logging(&matches)?;

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run(sub_matches),
        Some(("attach", sub_matches)) => commands::attach(sub_matches),
        Some(("config", sub_matches)) => commands::config::execute(sub_matches),
        Some(("completions", sub_matches)) => {
            let mut cli = build_cli();
            commands::completions::execute(sub_matches, &mut cli)
        }
        Some(("version", _)) => commands::version(),
        _ => {
            println!("procwatch - single process profiler");
            println!("Use 'procwatch --help' for more information.");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_run_collects_trailing_args() {
        let matches = build_cli()
            .try_get_matches_from(["procwatch", "run", "--json", "/bin/app", "--", "-x", "y"])
            .unwrap();
        let (_, run) = matches.subcommand().unwrap();
        assert!(run.get_flag("json"));
        let args: Vec<&String> = run.get_many::<String>("args").unwrap().collect();
        assert_eq!(args, ["-x", "y"]);
    }

    #[test]
    fn test_attach_parses_pid_and_cycles() {
        let matches = build_cli()
            .try_get_matches_from(["procwatch", "attach", "4242", "-n", "3"])
            .unwrap();
        let (name, attach) = matches.subcommand().unwrap();
        assert_eq!(name, "attach");
        assert_eq!(attach.get_one::<u32>("pid"), Some(&4242));
        assert_eq!(attach.get_one::<u64>("cycles"), Some(&3));
    }

    #[test]
    fn test_attach_terminate_conflicts_with_keep_alive() {
        let matches = build_cli()
            .try_get_matches_from(["procwatch", "attach", "4242", "--terminate"])
            .unwrap();
        let (_, attach) = matches.subcommand().unwrap();
        assert!(attach.get_flag("terminate"));

        let conflict = build_cli().try_get_matches_from([
            "procwatch",
            "attach",
            "4242",
            "--terminate",
            "--keep-alive",
        ]);
        assert!(conflict.is_err());
    }
}
