//! Triple-Lock CLI
//!
//! Every cipher operation and attack, offline.
//!
//! ```bash
//! triplelock caesar encrypt --shift 3 "HELLO"
//! triplelock transposition attack "C TAWT AATNAKD"
//! triplelock rsa generate --strength weak
//! triplelock triple attack -e 65537 -n 2773350997 "1684291 ..."
//! triplelock --json caesar attack "KHOOR ZRUOG"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use num_bigint::BigUint;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use triplelock_breaker::{
    CaesarBreaker, FactorBudget, RsaFactorizer, TranspositionBreaker, TripleLockBreaker,
};
use triplelock_cipher::{Caesar, Rsa, RsaKeyPair, Strength, Transposition, TripleLock};
use triplelock_config::Config;
use triplelock_core::{AttackResult, ShiftKey, TransKey};
use triplelock_lang::LanguageModel;

/// Rows shown in ranked tables
const TABLE_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "triplelock")]
#[command(about = "Caesar, transposition and RSA ciphers, and the attacks that break them")]
#[command(version)]
struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to $TRIPLELOCK_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log attack progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Caesar shift cipher
    Caesar {
        #[command(subcommand)]
        command: CaesarCommands,
    },

    /// Columnar transposition cipher
    Transposition {
        #[command(subcommand)]
        command: TranspositionCommands,
    },

    /// Textbook RSA
    Rsa {
        #[command(subcommand)]
        command: RsaCommands,
    },

    /// Caesar, then transposition, then RSA
    Triple {
        #[command(subcommand)]
        command: TripleCommands,
    },
}

#[derive(Subcommand)]
enum CaesarCommands {
    /// Shift text forward
    Encrypt {
        /// Shift, reduced modulo 26
        #[arg(short, long, allow_negative_numbers = true)]
        shift: ShiftKey,

        text: String,
    },

    /// Shift text back
    Decrypt {
        #[arg(short, long, allow_negative_numbers = true)]
        shift: ShiftKey,

        text: String,
    },

    /// Rank all 26 shifts
    Attack { text: String },
}

#[derive(Subcommand)]
enum TranspositionCommands {
    /// Encrypt with a keyword or read order
    Encrypt {
        /// Keyword (ZEBRA) or read order (4,2,1,3,0)
        #[arg(short, long)]
        key: TransKey,

        text: String,
    },

    /// Decrypt with a keyword or read order
    Decrypt {
        #[arg(short, long)]
        key: TransKey,

        text: String,
    },

    /// Search every read order up to the maximum key length
    Attack {
        text: String,

        /// Longest key length tried (overrides the config)
        #[arg(long)]
        max_key_len: Option<usize>,
    },
}

#[derive(Subcommand)]
enum RsaCommands {
    /// Generate a fresh key pair
    Generate {
        /// weak or strong
        #[arg(short, long, default_value = "strong")]
        strength: Strength,
    },

    /// Encrypt under (e, n)
    Encrypt {
        #[arg(short)]
        e: BigUint,

        #[arg(short)]
        n: BigUint,

        text: String,
    },

    /// Decrypt space-separated blocks under (d, n)
    Decrypt {
        #[arg(short)]
        d: BigUint,

        #[arg(short)]
        n: BigUint,

        text: String,
    },

    /// Factor n, recover d and decrypt
    Attack {
        #[arg(short)]
        e: BigUint,

        #[arg(short)]
        n: BigUint,

        text: String,
    },
}

#[derive(Subcommand)]
enum TripleCommands {
    /// Caesar, then transposition, then RSA
    Encrypt {
        #[arg(short, long, allow_negative_numbers = true)]
        shift: ShiftKey,

        #[arg(short, long)]
        key: TransKey,

        #[arg(short)]
        e: BigUint,

        #[arg(short)]
        n: BigUint,

        text: String,
    },

    /// Break RSA, transposition and Caesar in turn
    Attack {
        #[arg(short)]
        e: BigUint,

        #[arg(short)]
        n: BigUint,

        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "triplelock_breaker=info,triplelock_lang=info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let out = Output { json: cli.json };

    match cli.command {
        Commands::Caesar { command } => cmd_caesar(command, &config, out),
        Commands::Transposition { command } => cmd_transposition(command, &config, out),
        Commands::Rsa { command } => cmd_rsa(command, &config, out),
        Commands::Triple { command } => cmd_triple(command, &config, out),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn model(config: &Config) -> Result<Arc<LanguageModel>> {
    let language = &config.language;
    triplelock_lang::load(language.corpus_path.as_deref(), language.frequency_path.as_deref())
        .context("loading language model")
}

fn factorizer(config: &Config) -> RsaFactorizer {
    RsaFactorizer::new(
        FactorBudget::new(
            config.rsa.factor_iterations,
            Duration::from_millis(config.rsa.factor_time_ms),
        )
        .with_max_bits(config.rsa.max_modulus_bits),
    )
}

/// Refuse exponents and moduli wider than `rsa.max_modulus_bits`.
fn check_width(config: &Config, values: &[(&str, &BigUint)]) -> Result<()> {
    let limit = config.rsa.max_modulus_bits;
    for (name, value) in values {
        if value.bits() > limit {
            anyhow::bail!("{} is {} bits, above the {}-bit limit", name, value.bits(), limit);
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════

fn cmd_caesar(command: CaesarCommands, config: &Config, out: Output) -> Result<()> {
    match command {
        CaesarCommands::Encrypt { shift, text } => out.text("CAESAR ENCRYPT", &text, &Caesar::encrypt(&text, shift)),
        CaesarCommands::Decrypt { shift, text } => out.text("CAESAR DECRYPT", &text, &Caesar::decrypt(&text, shift)),
        CaesarCommands::Attack { text } => {
            let model = model(config)?;
            let mut result = CaesarBreaker::new(&*model).attack(&text);
            result.truncate(config.attack.top_n);
            out.ranked(&result)
        }
    }
}

fn cmd_transposition(command: TranspositionCommands, config: &Config, out: Output) -> Result<()> {
    match command {
        TranspositionCommands::Encrypt { key, text } => {
            out.text("TRANSPOSITION ENCRYPT", &text, &Transposition::encrypt(&text, &key))
        }
        TranspositionCommands::Decrypt { key, text } => {
            out.text("TRANSPOSITION DECRYPT", &text, &Transposition::decrypt(&text, &key))
        }
        TranspositionCommands::Attack { text, max_key_len } => {
            let model = model(config)?;
            let result = TranspositionBreaker::new(&*model)
                .with_max_key_len(max_key_len.unwrap_or(config.attack.transposition_max_key_len))
                .with_top_n(config.attack.top_n)
                .attack(&text)?;
            out.ranked(&result)
        }
    }
}

fn cmd_rsa(command: RsaCommands, config: &Config, out: Output) -> Result<()> {
    match command {
        RsaCommands::Generate { strength } => {
            let bits = strength.modulus_bits(config.rsa.weak_bits, config.rsa.strong_bits);
            let key = RsaKeyPair::generate(bits)?;
            if out.json {
                return out.emit(&serde_json::json!({
                    "public": [key.e.to_string(), key.n.to_string()],
                    "private": [key.d.to_string(), key.n.to_string()],
                    "bits": key.n.bits(),
                }));
            }
            println!("\n  RSA KEY ({}, {}-bit n)", strength, key.n.bits());
            println!("  Public  (e, n): ({}, {})", key.e, key.n);
            println!("  Private (d, n): ({}, {})", key.d, key.n);
            Ok(())
        }

        RsaCommands::Encrypt { e, n, text } => {
            check_width(config, &[("e", &e), ("n", &n)])?;
            let blocks = Rsa::encrypt(&text, &e, &n)?;
            out.text("RSA ENCRYPT", &text, &Rsa::format_blocks(&blocks))
        }

        RsaCommands::Decrypt { d, n, text } => {
            check_width(config, &[("d", &d), ("n", &n)])?;
            let blocks = Rsa::parse_blocks(&text)?;
            out.text("RSA DECRYPT", &text, &Rsa::decrypt(&blocks, &d, &n)?)
        }

        RsaCommands::Attack { e, n, text } => {
            let blocks = Rsa::parse_blocks(&text)?;
            let attack = factorizer(config).attack(&e, &n, &blocks)?;
            let key = &attack.key;
            if out.json {
                return out.emit(&serde_json::json!({
                    "private_key": [key.d.to_string(), key.n.to_string()],
                    "decrypted": attack.decrypted,
                    "details": {
                        "p": key.factors.p.to_string(),
                        "q": key.factors.q.to_string(),
                        "phi": key.phi.to_string(),
                        "d": key.d.to_string(),
                        "method": key.factors.method,
                        "iterations": key.factors.iterations,
                    },
                }));
            }
            println!("\n  RSA ATTACK");
            println!("  n = {} = {} x {}", key.n, key.factors.p, key.factors.q);
            println!("  Method: {} ({} iterations, {:?})", key.factors.method, key.factors.iterations, attack.elapsed);
            println!("  phi(n) = {}", key.phi);
            println!("  d = {}", key.d);
            println!("  Decrypted: {}", attack.decrypted);
            Ok(())
        }
    }
}

fn cmd_triple(command: TripleCommands, config: &Config, out: Output) -> Result<()> {
    match command {
        TripleCommands::Encrypt { shift, key, e, n, text } => {
            check_width(config, &[("e", &e), ("n", &n)])?;
            let blocks = TripleLock::encrypt(&text, shift, &key, &e, &n)?;
            out.text("TRIPLE-LOCK ENCRYPT", &text, &Rsa::format_blocks(&blocks))
        }

        TripleCommands::Attack { e, n, text } => {
            let blocks = Rsa::sanitize_blocks(&text);
            if blocks.is_empty() {
                anyhow::bail!("No valid integer ciphertext found.");
            }

            let model = model(config)?;
            let result = TripleLockBreaker::new(&*model, factorizer(config))
                .with_max_key_len(config.attack.transposition_max_key_len)
                .with_paths(config.attack.pipeline_paths)
                .attack(&blocks, &e, &n);

            if out.json {
                return out.emit(&serde_json::json!({
                    "stages": result.stages,
                    "final_plaintext": result.final_plaintext(),
                    "success": result.success(),
                }));
            }

            println!("\n  TRIPLE-LOCK ATTACK");
            for stage in &result.stages {
                println!("  [{}] {:<14} {}", stage.stage.number(), stage.stage, stage.summary());
            }
            match result.final_plaintext() {
                Some(plaintext) => println!("\n  Plaintext: {}", plaintext),
                None => println!("\n  Attack stopped; no plaintext recovered."),
            }
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn text(&self, title: &str, input: &str, result: &str) -> Result<()> {
        if self.json {
            return self.emit(&serde_json::json!({ "result": result }));
        }
        println!("\n  {}", title);
        println!("  Input:  {}", input);
        println!("  Output: {}", result);
        Ok(())
    }

    /// Top rows of a ranked attack, like a leaderboard.
    fn ranked<K: Serialize + std::fmt::Display + Ord>(&self, result: &AttackResult<K>) -> Result<()> {
        if self.json {
            return self.emit(result);
        }

        let Some(top) = result.best() else {
            println!("\n  No likely candidates found.");
            return Ok(());
        };

        println!("{:-<72}", "");
        println!("TOP CANDIDATES ({} keys searched)", result.searched);
        println!("{:-<72}", "");
        println!("{:<5} {:<11} {:<26} TEXT", "RANK", "CONFIDENCE", "KEY");
        for (i, candidate) in result.candidates.iter().take(TABLE_ROWS).enumerate() {
            let preview: String = candidate.plaintext.chars().take(30).collect();
            println!(
                "#{:<4} {:>6.1}%     {:<26} {}",
                i + 1,
                candidate.details.confidence * 100.0,
                candidate.key.to_string(),
                preview.replace('\n', " ")
            );
        }

        println!("\nSelected: {}", top.key);
        println!(
            "log10 P = {:.3} | per symbol {:.3}",
            top.details.log_prob, top.details.avg_log_prob
        );
        for line in top.details.details.iter().take(8) {
            println!("  {}", line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("triplelock").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_shift() {
        let cli = parse(&["caesar", "encrypt", "--shift", "-3", "HELLO"]).unwrap();
        match cli.command {
            Commands::Caesar {
                command: CaesarCommands::Encrypt { shift, text },
            } => {
                assert_eq!(shift, ShiftKey::new(23));
                assert_eq!(text, "HELLO");
            }
            _ => panic!("expected caesar encrypt"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["transposition", "attack", "C TAWT AATNAKD", "--max-key-len", "5", "--json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Transposition {
                command: TranspositionCommands::Attack { max_key_len: Some(5), .. }
            }
        ));
    }

    #[test]
    fn test_big_integer_arguments() {
        let cli = parse(&["rsa", "attack", "-e", "65537", "-n", "123456789012345678901234567890", "12 34"]).unwrap();
        match cli.command {
            Commands::Rsa {
                command: RsaCommands::Attack { e, n, .. },
            } => {
                assert_eq!(e, BigUint::from(65_537u32));
                assert_eq!(n.to_string(), "123456789012345678901234567890");
            }
            _ => panic!("expected rsa attack"),
        }
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(parse(&["transposition", "encrypt", "--key", "0,0,1", "ATTACK"]).is_err());
        assert!(parse(&["rsa", "generate", "--strength", "medium"]).is_err());
        assert!(parse(&["rsa", "encrypt", "-e", "abc", "-n", "3233", "hi"]).is_err());
        assert!(parse(&["caesar", "attack"]).is_err());
    }

    #[test]
    fn test_strength_defaults_to_strong() {
        let cli = parse(&["rsa", "generate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Rsa {
                command: RsaCommands::Generate { strength: Strength::Strong }
            }
        ));
    }

    #[test]
    fn test_width_limit() {
        let config = Config::default();
        let small = BigUint::from(3233u32);
        let wide = BigUint::from(1u32) << 2048usize;
        assert!(check_width(&config, &[("e", &small), ("n", &small)]).is_ok());

        let err = check_width(&config, &[("e", &small), ("n", &wide)]).unwrap_err();
        assert_eq!(err.to_string(), "n is 2049 bits, above the 2048-bit limit");

        let out = Output { json: true };
        let command = RsaCommands::Encrypt { e: small, n: wide, text: "hi".into() };
        assert!(cmd_rsa(command, &config, out).is_err());
    }

    #[test]
    fn test_budget_follows_config() {
        let mut config = Config::default();
        config.rsa.factor_iterations = 99;
        config.rsa.max_modulus_bits = 4096;
        let budget = factorizer(&config).budget();
        assert_eq!(budget.max_iterations, 99);
        assert_eq!(budget.max_bits, 4096);
    }
}
