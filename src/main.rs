use std::path::PathBuf;

use feedscroll::app::RunOptions;
use feedscroll::model::SortMode;

const HELP: &str = "feedscroll - Infinite-scroll Reddit feeds in the terminal.

  --feed,    -f <name>   Subreddit to open (default from config: reactjs)
  --sort,    -s <mode>   hot, new, top or rising
  --config,  -c <path>   Read configuration from <path>
  --version, -V          Show version and exit
  --help,    -h          Show this help message";

enum Cli {
    Run(RunOptions),
    Exit,
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Cli::Run(options)) => options,
        Ok(Cli::Exit) => return,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    if let Err(err) = feedscroll::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut options = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("feedscroll {}", feedscroll::VERSION);
                return Ok(Cli::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Cli::Exit);
            }
            "--feed" | "-f" => {
                let value = args.next().ok_or("--feed requires a subreddit name")?;
                options.feed = Some(value);
            }
            "--sort" | "-s" => {
                let value = args.next().ok_or("--sort requires a mode")?;
                options.sort = Some(value.parse::<SortMode>()?);
            }
            "--config" | "-c" => {
                let value = args.next().ok_or("--config requires a path")?;
                options.config_file = Some(PathBuf::from(value));
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(Cli::Run(options))
}
