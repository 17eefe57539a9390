use clap::{Parser, Subcommand};

const DEFAULT_URL: &str = "http://127.0.0.1:8787";

#[derive(Parser, Debug)]
#[command(name = "cachamita", about = "Terminal client for the Cachamita chat relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the client version
    Version,

    /// Chat interactively; Ctrl-C stops the current reply, Ctrl-D exits
    Chat {
        /// Base URL of the relay server
        #[arg(long, env = "CACHAMITA_URL", default_value = DEFAULT_URL)]
        url: String,
    },

    /// Send one message and print the reply
    Ask {
        /// Base URL of the relay server
        #[arg(long, env = "CACHAMITA_URL", default_value = DEFAULT_URL)]
        url: String,

        /// Message to send
        message: String,
    },
}
