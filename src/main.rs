use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use tracksolid::generate::{Region, Smoothing};
use tracksolid::{generate_with_progress, parse_gpx, Options, ProjSource, ShapeType};

/// Convert a GPX track into a printable 3D ribbon solid.
#[derive(Parser, Debug)]
#[command(name = "tracksolid", version)]
struct Cli {
    /// Input GPX file
    #[arg(long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Output binary STL file
    #[arg(long = "out", value_name = "PATH")]
    output: PathBuf,

    /// Ribbon half-width, model millimeters
    #[arg(long, default_value_t = 2.0)]
    buffer: f64,

    /// Vertical exaggeration factor
    #[arg(long, default_value_t = 1.0)]
    vertical: f64,

    /// Printable bed width, millimeters
    #[arg(long, default_value_t = 200.0)]
    bedx: f64,

    /// Printable bed depth, millimeters
    #[arg(long, default_value_t = 200.0)]
    bedy: f64,

    /// Base thickness under the ribbon, millimeters
    #[arg(long, default_value_t = 1.0)]
    base: f64,

    /// 0 = map, 1 = linear profile, 2 = ring
    #[arg(long, default_value_t = 0)]
    shapetype: u8,

    /// 0 = web mercator (GOOGLE), 1 = custom proj4 string, 2 = auto UTM
    #[arg(long, default_value_t = 0)]
    projtype: u8,

    /// proj4 definition, used with --projtype 1
    #[arg(long, default_value = "")]
    projection: String,

    /// Force every elevation to the value of --zconstant
    #[arg(long)]
    zoverride: bool,

    /// Elevation used by --zoverride and for points without an <ele>
    #[arg(long, default_value_t = 1.0)]
    zconstant: f64,

    /// Shift elevations so the minimum sits just above zero
    #[arg(long)]
    zcut: bool,

    /// Replace the natural planar bounds with the --region-* rectangle
    #[arg(long)]
    regionfit: bool,

    #[arg(long, default_value_t = 0.0)]
    region_minx: f64,

    #[arg(long, default_value_t = 0.0)]
    region_maxx: f64,

    #[arg(long, default_value_t = 0.0)]
    region_miny: f64,

    #[arg(long, default_value_t = 0.0)]
    region_maxy: f64,

    /// Geodesic meters between distance markers; 0 disables them
    #[arg(long, default_value_t = 0.0)]
    marker_interval: f64,

    /// 0 = derive station spacing from the bed scale, 1 = use --smoothspan
    #[arg(long, default_value_t = 0)]
    smoothtype: u8,

    /// Minimum station spacing in meters, used with --smoothtype 1
    #[arg(long, default_value_t = 0.0)]
    smoothspan: f64,

    /// Also write OpenSCAD source
    #[arg(long, value_name = "PATH")]
    openscad: Option<PathBuf>,

    /// Also write OpenJSCAD source
    #[arg(long, value_name = "PATH")]
    jscad: Option<PathBuf>,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let xml = fs::read_to_string(&cli.input)?;
    let (points, track) = parse_gpx(&xml, cli.zconstant, cli.zoverride)?;

    let name = if track.name.is_empty() {
        "unnamed track"
    } else {
        track.name.as_str()
    };
    println!(
        "{name}: {} points, {:.2} km",
        track.points,
        track.distance / 1_000.0
    );
    if track.has_elevation {
        println!(
            "elevation {:.0} m to {:.0} m, +{:.0} m / -{:.0} m",
            track.min_ele, track.max_ele, track.gain, track.loss
        );
    }

    let shape = ShapeType::try_from(cli.shapetype)
        .map_err(|v| format!("unknown shapetype {v}, expected 0..=2"))?;
    let proj_source = ProjSource::try_from(cli.projtype)
        .map_err(|v| format!("unknown projtype {v}, expected 0..=2"))?;
    let smoothing = match cli.smoothtype {
        0 => Smoothing::Auto,
        1 => Smoothing::Span(cli.smoothspan),
        v => return Err(format!("unknown smoothtype {v}, expected 0 or 1").into()),
    };

    let options = Options {
        buffer: cli.buffer,
        vertical: cli.vertical,
        bedx: cli.bedx,
        bedy: cli.bedy,
        base: cli.base,
        shape,
        proj_source,
        projection: cli.projection,
        zoverride: cli.zoverride,
        zconstant: cli.zconstant,
        zcut: cli.zcut,
        region: cli.regionfit.then_some(Region {
            min_x: cli.region_minx,
            min_y: cli.region_miny,
            max_x: cli.region_maxx,
            max_y: cli.region_maxy,
        }),
        marker_interval: cli.marker_interval,
        smoothing,
    };

    let artifact = generate_with_progress(&points, &options, |phase| {
        info!("{:>3}% {phase}", phase.percent());
    })?;

    fs::write(&cli.output, artifact.stl())?;
    println!(
        "wrote {}: {} triangles, {} markers, scale 1:{:.0}",
        cli.output.display(),
        artifact.triangles.len() + 12 * artifact.markers.len(),
        artifact.markers.len(),
        1_000.0 / artifact.scale
    );

    if let Some(path) = &cli.openscad {
        fs::write(path, artifact.openscad())?;
        println!("wrote {}", path.display());
    }
    if let Some(path) = &cli.jscad {
        fs::write(path, artifact.jscad(false))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}
