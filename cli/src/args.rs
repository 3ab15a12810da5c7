use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hbpf")]
#[command(about = "hBPF program runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Invoke the entry point of a program
    Run {
        /// Path to the program (.hbf container or raw binary)
        path: String,
        /// Arguments bound to R1..R5 (comma-separated, decimal or 0x hex)
        #[arg(long, value_delimiter = ',', value_parser = parse_u64)]
        args: Vec<u64>,
        /// Helper/VM configuration file
        #[arg(long)]
        config: Option<String>,
        /// File mapped as context memory
        #[arg(long)]
        data: Option<String>,
        /// Entry arity of a raw binary (defaults to the number of arguments)
        #[arg(long)]
        arity: Option<u8>,
        /// Raw binary entry point returns nothing
        #[arg(long)]
        void: bool,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Link a program against the configured helpers without running it
    Verify {
        /// Path to the program
        path: String,
        /// Helper/VM configuration file
        #[arg(long)]
        config: Option<String>,
    },
    /// Print the instructions of a program
    Disassemble {
        /// Path to the program
        path: String,
    },
    /// List the helpers a configuration provides
    Helpers {
        /// Helper/VM configuration file
        #[arg(long)]
        config: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid argument `{}`: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64_accepts_hex() {
        assert_eq!(parse_u64("42"), Ok(42));
        assert_eq!(parse_u64("0xff"), Ok(255));
        assert!(parse_u64("-1").is_err());
    }
}
