use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use emberflow::config::{SimConfig, DEFAULT_SIZE};
use emberflow::cpu::CpuExecutor;
use emberflow::dispatch::FrameDispatcher;
use emberflow::error::{OutputError, SimulationError};
use emberflow::gpu::{GpuContext, GpuExecutor};
use emberflow::image_out::{frame_path, save_png};
use emberflow::time::FrameClock;

const USAGE: &str = "\
Usage: emberflow [fire|trails|flow] [options]

Options:
  --frames N      frames to simulate (default 240)
  --size WxH      grid resolution (default 1280x720)
  --particles N   override the particle count
  --seed N        spawn seed
  --every N       also write every Nth frame (default: last frame only)
  --out DIR       output directory (default ./frames)
  --gpu           run on the GPU instead of the CPU
  -h, --help      print this message";

struct Options {
    effect: String,
    config: SimConfig,
    frames: u64,
    every: u64,
    out: PathBuf,
    gpu: bool,
}

fn parse_value<T: FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .map_err(|_| format!("invalid value for {}: {}", flag, value))
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("size must look like 1280x720, got {}", value))?;
    let w = w.parse().map_err(|_| format!("invalid width: {}", w))?;
    let h = h.parse().map_err(|_| format!("invalid height: {}", h))?;
    Ok((w, h))
}

impl Options {
    /// `Ok(None)` means help was requested.
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, String> {
        let mut effect = String::from("fire");
        let mut size = (DEFAULT_SIZE.width, DEFAULT_SIZE.height);
        let mut frames = 240;
        let mut every = 0;
        let mut out = PathBuf::from("frames");
        let mut gpu = false;
        let mut particles = None;
        let mut seed = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--frames" => frames = parse_value(&arg, args.next())?,
                "--size" => size = parse_size(&parse_value::<String>(&arg, args.next())?)?,
                "--particles" => particles = Some(parse_value(&arg, args.next())?),
                "--seed" => seed = Some(parse_value(&arg, args.next())?),
                "--every" => every = parse_value(&arg, args.next())?,
                "--out" => out = parse_value(&arg, args.next())?,
                "--gpu" => gpu = true,
                flag if flag.starts_with('-') => return Err(format!("unknown option {}", flag)),
                name => effect = name.to_string(),
            }
        }

        let mut config = SimConfig::preset(&effect, size.0, size.1)
            .ok_or_else(|| format!("unknown effect {}", effect))?;
        if let Some(count) = particles {
            config = config.with_particle_count(count);
        }
        if let Some(seed) = seed {
            config = config.with_seed(seed);
        }

        Ok(Some(Self {
            effect,
            config,
            frames,
            every,
            out,
            gpu,
        }))
    }
}

enum Runner {
    Cpu(FrameDispatcher<CpuExecutor>),
    Gpu(FrameDispatcher<GpuExecutor>),
}

impl Runner {
    fn new(config: &SimConfig, gpu: bool) -> Result<Self, SimulationError> {
        if gpu {
            let context = GpuContext::request_blocking()?;
            Ok(Runner::Gpu(FrameDispatcher::new(GpuExecutor::new(context, config)?)))
        } else {
            Ok(Runner::Cpu(FrameDispatcher::new(CpuExecutor::new(config)?)))
        }
    }

    fn dispatch(&mut self, time: f32) {
        match self {
            Runner::Cpu(dispatcher) => {
                dispatcher.dispatch(time);
            }
            Runner::Gpu(dispatcher) => {
                dispatcher.dispatch(time);
            }
        }
    }

    /// Images drawn by the last frame, tagged with the grid they came from.
    fn images(&self) -> Result<Vec<(&'static str, Vec<u32>)>, SimulationError> {
        let mut images = Vec::new();
        match self {
            Runner::Cpu(dispatcher) => {
                let executor = dispatcher.executor();
                if executor.heat().is_some() {
                    images.push(("heat", executor.heat_image().to_vec()));
                }
                if executor.energy().is_some() {
                    images.push(("energy", executor.energy_image().to_vec()));
                }
            }
            Runner::Gpu(dispatcher) => {
                let executor = dispatcher.executor();
                if let Some(pixels) = executor.read_heat_image()? {
                    images.push(("heat", pixels));
                }
                if let Some(pixels) = executor.read_energy_image()? {
                    images.push(("energy", pixels));
                }
            }
        }
        Ok(images)
    }
}

fn run(options: &Options) -> Result<(), SimulationError> {
    let config = &options.config;
    config.validate()?;
    std::fs::create_dir_all(&options.out).map_err(OutputError::from)?;

    let mut runner = Runner::new(config, options.gpu)?;
    let mut clock = FrameClock::fixed(1.0 / 60.0);

    for frame in 0..options.frames {
        runner.dispatch(clock.tick());

        let last = frame + 1 == options.frames;
        if last || (options.every > 0 && frame % options.every == 0) {
            for (grid, pixels) in runner.images()? {
                let stem = format!("{}_{}", options.effect, grid);
                let path = frame_path(&options.out, &stem, frame);
                save_png(&path, config.size, &pixels)?;
                log::info!("Wrote {}", path.display());
            }
        }
    }

    log::info!(
        "{} {} frames at {}x{} in {:.2?}",
        options.frames,
        options.effect,
        config.size.width,
        config.size.height,
        clock.wall_elapsed()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
