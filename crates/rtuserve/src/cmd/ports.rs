use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};

use crate::cmd::PortsArgs;
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::OutputFormat;

#[derive(Serialize, Debug, PartialEq)]
struct PortOutput {
    name: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    usb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<&SerialPortInfo> for PortOutput {
    fn from(info: &SerialPortInfo) -> Self {
        let (kind, usb_id, description) = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = match (&usb.manufacturer, &usb.product) {
                    (Some(m), Some(p)) => Some(format!("{m} {p}")),
                    (Some(m), None) => Some(m.clone()),
                    (None, Some(p)) => Some(p.clone()),
                    (None, None) => None,
                };
                (
                    "usb",
                    Some(format!("{:04x}:{:04x}", usb.vid, usb.pid)),
                    description,
                )
            }
            SerialPortType::PciPort => ("pci", None, None),
            SerialPortType::BluetoothPort => ("bluetooth", None, None),
            SerialPortType::Unknown => ("unknown", None, None),
        };
        Self {
            name: info.port_name.clone(),
            kind,
            usb_id,
            description,
        }
    }
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = serialport::available_ports().map_err(|err| {
        CliError::new(TRANSPORT_ERROR, format!("port enumeration failed: {err}"))
    })?;
    let ports: Vec<PortOutput> = ports.iter().map(PortOutput::from).collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&ports).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "TYPE", "USB ID", "DESCRIPTION"]);
            for port in &ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.usb_id.clone().unwrap_or_default(),
                    port.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for port in &ports {
                println!("{}", port.name);
            }
        }
    }

    Ok(SUCCESS)
}
