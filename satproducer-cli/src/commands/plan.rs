//! `satproducer plan`: list the files a message would produce.

use clap::Args;
use satproducer::config::{ProducerSettings, DEFAULT_SECTION};
use satproducer::message::Message;
use satproducer::planner::{preview, PlannedProduct};
use satproducer::product::ProductConfig;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Producer settings file (INI)
    #[arg(long, short)]
    pub config: PathBuf,

    /// Section of the settings file to use
    #[arg(long, default_value = DEFAULT_SECTION)]
    pub section: String,

    /// File holding one bus message line, or `-` for stdin
    #[arg(long, short)]
    pub message: String,
}

fn read_message(source: &str) -> Result<Message, CliError> {
    let text = if source == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        std::fs::read_to_string(source)
    }
    .map_err(|error| CliError::MessageRead {
        path: source.to_string(),
        error,
    })?;
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    Ok(Message::decode(line)?)
}

/// One line per destination, indented under its product.
fn render(planned: &[PlannedProduct]) -> Vec<String> {
    let mut lines = Vec::new();
    for product in planned {
        let place = match (&product.group, &product.area) {
            (Some(group), Some(area)) => format!("{}/{}", group, area),
            _ => "(unprojected)".to_string(),
        };
        lines.push(format!("{} {}", place, product.product));
        for output in &product.outputs {
            match output {
                Ok(path) => lines.push(format!("    {}", path.display())),
                Err(e) => lines.push(format!("    ! {}", e)),
            }
        }
    }
    lines
}

pub fn run(args: PlanArgs) -> Result<(), CliError> {
    let settings = ProducerSettings::load_from(&args.config, &args.section)?;
    let msg = read_message(&args.message)?;
    info!(subject = %msg.subject, kind = msg.kind(), "Planning message");

    if !msg.carries_data() {
        println!("Ignored: {} messages carry no data", msg.kind());
        return Ok(());
    }
    let sensors = msg.sensors();
    if !settings.handles_any(&sensors) {
        println!(
            "Ignored: sensors [{}] not among instruments [{}]",
            sensors.join(", "),
            settings.instruments.join(", ")
        );
        return Ok(());
    }

    let config = ProductConfig::load(&settings.product_config_file)?;
    let planned = preview(&config, &msg);
    if planned.is_empty() {
        println!("Nothing to produce for this message");
        return Ok(());
    }
    for line in render(&planned) {
        println!("{}", line);
    }
    println!();
    println!("Coverage and sun angle limits are checked at production time.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LINE: &str = r#"pytroll://oper/polar/direct_readout file pps@satin 2016-03-01T12:50:00.000000 v1.01 application/json {"uri": "/data/hrpt.l1b", "platform_name": "NOAA-19", "sensor": "avhrr/3", "start_time": "2016-03-01T12:30:00"}"#;

    #[test]
    fn test_read_message_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("msg.txt");
        std::fs::write(&path, format!("\n\n{}\n", LINE)).unwrap();

        let msg = read_message(path.to_str().unwrap()).unwrap();
        assert_eq!(msg.platform_name(), Some("NOAA-19"));
        assert_eq!(msg.sender, "pps@satin");
    }

    #[test]
    fn test_read_message_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.txt");
        let err = read_message(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CliError::MessageRead { .. }));
    }

    #[test]
    fn test_render() {
        let config = ProductConfig::from_json(
            r#"{"common": {"output_dir": "/out"},
                "groups": [{"id": "europe", "areas": [{"id": "euron1", "products": [
                    {"id": "overview", "files": [{"filename": "{platform_name}_ov.png"}, {"filename": "{nope}.png"}]}
                ]}]}]}"#,
        )
        .unwrap();
        let msg = Message::decode(LINE).unwrap();
        let lines = render(&preview(&config, &msg));
        assert_eq!(lines[0], "europe/euron1 overview");
        assert_eq!(lines[1], "    /out/NOAA-19_ov.png");
        assert!(lines[2].starts_with("    ! "));
    }
}
