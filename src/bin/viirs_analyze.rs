use clap::Parser;
use std::path::PathBuf;
use viirs_export::analysis::report::SUMMARY_FILE;
use viirs_export::analysis::{analyze, assess_site, write_summary_csv, AnalysisOptions, Suitability};
use viirs_export::analysis::stats::DARK_SKY_THRESHOLD;
use viirs_export::config::toml_config::DEFAULT_BAND;
use viirs_export::core::plan::DEFAULT_DESCRIPTION_PREFIX;
use viirs_export::domain::model::YearRange;
use viirs_export::utils::logger;

#[derive(Parser)]
#[command(name = "viirs-analyze")]
#[command(about = "Summarize downloaded VIIRS sample tables and check dark-sky suitability")]
struct Args {
    /// Directory holding the downloaded <prefix><year>.csv tables
    #[arg(short, long, default_value = "./data/viirs")]
    data_dir: PathBuf,

    /// File name prefix used by the exports
    #[arg(long, default_value = DEFAULT_DESCRIPTION_PREFIX)]
    prefix: String,

    /// Radiance column
    #[arg(long, default_value = DEFAULT_BAND)]
    band: String,

    #[arg(long, default_value_t = 2014)]
    start_year: i32,

    #[arg(long, default_value_t = 2023)]
    end_year: i32,

    /// Drop radiance outliers outside the 1.5×IQR fences before summarizing
    #[arg(long)]
    robust: bool,

    /// Where to write the summary table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Latitude of a site to check (requires --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of a site to check (requires --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Year to use for the site check (defaults to the last analysed year)
    #[arg(long)]
    year: Option<i32>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let options = AnalysisOptions {
        data_dir: args.data_dir.clone(),
        prefix: args.prefix.clone(),
        band: args.band.clone(),
        years: YearRange::new(args.start_year, args.end_year),
        remove_outliers: args.robust,
    };

    let report = match analyze(&options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    println!("📊 Yearly radiance ({}):", args.band);
    for (year, yoy) in report.years.iter().zip(&report.year_over_year) {
        let s = &year.summary;
        let change = yoy
            .map(|c| format!("{:+.2}%", c))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  n={:<5} mean={:<8.3} median={:<8.3} max={:<9.2} yoy={}",
            s.year, s.count, s.mean, s.median, s.max, change
        );
        if year.outliers_removed > 0 {
            println!("        ({} outliers removed)", year.outliers_removed);
        }
    }
    if !report.missing_years.is_empty() {
        println!("  ⚠️ Missing years: {:?}", report.missing_years);
    }

    if let Some(change) = report.overall_change() {
        println!();
        println!("Overall change in mean radiance: {:.2}%", change);
        for (region, change) in report.regional_change() {
            println!("  {}: {:.2}%", region, change);
        }
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.data_dir.join(SUMMARY_FILE));
    let file = std::fs::File::create(&output)?;
    write_summary_csv(&report, file)?;
    println!();
    println!("📁 Summary saved to: {}", output.display());

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let analysis = match args.year {
            Some(year) => report.year(year),
            None => report.years.last(),
        };
        let Some(analysis) = analysis else {
            anyhow::bail!("No data loaded for the requested year");
        };

        println!();
        println!(
            "🔍 Site ({:.4}, {:.4}) in {}:",
            lat, lon, analysis.summary.year
        );
        match assess_site(&analysis.points, lat, lon) {
            Some(site) => {
                println!("  📍 Closest data point: {:.2} meters away", site.distance_m);
                println!("  💡 Radiance: {:.2} nW/cm²/sr", site.nearest.radiance);
                match site.suitability {
                    Suitability::Suitable => println!("  ✅ Suitable for dark-sky observation"),
                    Suitability::Unsuitable => println!(
                        "  ❌ Unsuitable for dark-sky observation (above {})",
                        DARK_SKY_THRESHOLD
                    ),
                }
            }
            None => println!("  ⚠️ No lit sample points found"),
        }
    }

    Ok(())
}
