//! Line-oriented host for the command facade.
//! Each stdin line is one command with tab-separated arguments, e.g.
//! `translate_async\t1\t你好\tzh\ten`. Replies go to stdout, one per line.

use std::io::{self, BufRead, Write};

use tracing::{info, warn};
use transrelay::{ClientFacade, EngineConfig};

fn main() -> io::Result<()> {
    transrelay::init_tracing();
    info!("{}", ClientFacade::version());

    let facade = ClientFacade::new(EngineConfig::from_env());

    if let Ok(key) = std::env::var("TRANSRELAY_API_KEY") {
        let reply = facade.handle(&["setkey", key.as_str()]);
        if reply.as_text() != Some("ok") {
            warn!(reply = %reply, "initial setkey failed");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        let args: Vec<&str> = line.split('\t').collect();
        let reply = facade.handle(&args);
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }

    facade.engine().shutdown();
    info!("transrelay exiting");
    Ok(())
}
