//! Command-line demo: start a recognition session, poll it, print what it
//! hears.
//!
//! ```text
//! splistener --hmm models/en-us --dict models/en-us.dict --lm models/en-us.lm
//! splistener --config session.json --wav meeting.wav
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use splistener_core::{
    AudioSource, RecognitionSession, SessionConfig, SessionState, SpeechDecoder, StubDecoder,
    WavSource,
};

#[derive(Debug)]
struct Args {
    config_file: Option<PathBuf>,
    hmm: Option<PathBuf>,
    kws: Option<PathBuf>,
    lm: Option<PathBuf>,
    dict: Option<PathBuf>,
    rate: Option<u32>,
    delay_ms: Option<u64>,
    wav: Option<PathBuf>,
    duration_secs: u64,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config_file: None,
        hmm: None,
        kws: None,
        lm: None,
        dict: None,
        rate: None,
        delay_ms: None,
        wav: None,
        duration_secs: 10,
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let path_value = |name: &str, it: &mut dyn Iterator<Item = String>| {
            it.next()
                .map(PathBuf::from)
                .ok_or_else(|| format!("missing value for {name}"))
        };
        match arg.as_str() {
            "--config" => args.config_file = Some(path_value("--config", &mut it)?),
            "--hmm" => args.hmm = Some(path_value("--hmm", &mut it)?),
            "--kws" => args.kws = Some(path_value("--kws", &mut it)?),
            "--lm" => args.lm = Some(path_value("--lm", &mut it)?),
            "--dict" => args.dict = Some(path_value("--dict", &mut it)?),
            "--wav" => args.wav = Some(path_value("--wav", &mut it)?),
            "--rate" => {
                let v = it.next().ok_or("missing value for --rate")?;
                args.rate = Some(v.parse().map_err(|_| "invalid value for --rate")?);
            }
            "--delay-ms" => {
                let v = it.next().ok_or("missing value for --delay-ms")?;
                args.delay_ms = Some(v.parse().map_err(|_| "invalid value for --delay-ms")?);
            }
            "--duration" => {
                let v = it.next().ok_or("missing value for --duration")?;
                args.duration_secs = v.parse().map_err(|_| "invalid value for --duration")?;
            }
            "--help" | "-h" => {
                println!(
                    "Usage: splistener [--config <file.json>] --hmm <dir> --dict <file> \\
  [--kws <file> | --lm <file>] [--rate <hz>] [--delay-ms <ms>] \\
  [--wav <file>] [--duration <secs>]"
                );
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn build_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let mut config = match &args.config_file {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    // Command-line flags override the config file.
    if let Some(hmm) = &args.hmm {
        config.hmm_path = hmm.clone();
    }
    if let Some(kws) = &args.kws {
        config.kws_path = Some(kws.clone());
    }
    if let Some(lm) = &args.lm {
        config.lm_path = Some(lm.clone());
    }
    if let Some(dict) = &args.dict {
        config.dict_path = dict.clone();
    }
    if let Some(rate) = args.rate {
        config.sample_rate = rate;
    }
    if let Some(delay) = args.delay_ms {
        config.decode_interval_ms = delay;
    }
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e} (try --help)");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("splistener failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let mut session = RecognitionSession::new(config.clone());

    match &args.wav {
        Some(wav) => {
            let wav = wav.clone();
            let rate = config.sample_rate;
            let decoder_config = config.clone();
            session
                .initialize_with(
                    move || WavSource::open(&wav, rate).map(|s| Box::new(s) as Box<dyn AudioSource>),
                    move || {
                        StubDecoder::open(&decoder_config)
                            .map(|d| Box::new(d) as Box<dyn SpeechDecoder>)
                    },
                )
                .context("initializing session from WAV file")?;
        }
        None => session.initialize().context("initializing session")?,
    }

    info!(duration_secs = args.duration_secs, "listening");
    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);
    let poll_interval = Duration::from_millis(config.decode_interval_ms);

    while Instant::now() < deadline {
        std::thread::sleep(poll_interval);

        let text = session.poll_text();
        if !text.is_empty() {
            println!("{text}");
        }
        let error = session.poll_error();
        if !error.is_empty() {
            warn!(%error, "session reported an error");
        }
        if session.state() == SessionState::Stopped {
            break;
        }
    }

    session.shutdown();
    let stats = session.diagnostics();
    info!(
        frames_in = stats.frames_in,
        feed_errors = stats.feed_errors,
        decode_calls = stats.decode_calls,
        decode_errors = stats.decode_errors,
        results_published = stats.results_published,
        "session finished"
    );
    Ok(())
}
