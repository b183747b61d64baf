use anyhow::Result;
use backbeat::args::CliArgs;
use backbeat::audio::playback_engine::{Backend, PlaybackEngine};
use backbeat::repl::Repl;
use backbeat::{logging, settings};

fn main() -> Result<()> {
    let args = CliArgs::parse();
    if args.show_help {
        CliArgs::print_help();
        return Ok(());
    }

    logging::init();

    let config = settings::resolve(&args)?;
    let backend = if args.silent {
        Backend::Silent
    } else {
        Backend::Speakers
    };

    let engine = match PlaybackEngine::spawn(config, backend) {
        Ok(engine) => engine,
        Err(e) if backend == Backend::Speakers => {
            log::warn!("Audio output unavailable ({}); running silent", e);
            PlaybackEngine::spawn(config, Backend::Silent)?
        }
        Err(e) => return Err(e),
    };

    Repl::new(engine)?.run()
}
