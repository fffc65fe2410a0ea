mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{Session, StoreBacking};

fn main() -> io::Result<()> {
    let backing = parse_store_backing().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: repeater-emulator [--store <path>]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(backing);
    let mut line = String::new();

    writeln!(
        writer,
        "Repeater Lifecycle Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed);
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_store_backing() -> Result<StoreBacking, String> {
    let mut args = env::args().skip(1);
    match args.next() {
        None => Ok(StoreBacking::Memory),
        Some(arg) => {
            if let Some(path) = arg.strip_prefix("--store=") {
                Ok(StoreBacking::File(path.into()))
            } else if arg == "--store" {
                args.next()
                    .map(|path| StoreBacking::File(path.into()))
                    .ok_or_else(|| "Expected path after --store".to_string())
            } else {
                Err(format!("Unknown argument `{arg}`"))
            }
        }
    }
}
