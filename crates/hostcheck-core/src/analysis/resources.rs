//! Informational rows built from OS resource counters.

use serde::Serialize;

use crate::collector::traits::ResourceCounters;
use crate::fmt::{format_bytes, format_load_average, format_percent};
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ResourceGroup {
    Memory,
    Cpu,
    Storage,
    Network,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct ResourceRow {
    pub group: ResourceGroup,
    #[cfg_attr(feature = "api", schema(value_type = String))]
    pub label: &'static str,
    pub value: Value,
}

fn row(group: ResourceGroup, label: &'static str, value: Option<String>) -> ResourceRow {
    ResourceRow {
        group,
        label,
        value: value.map_or(Value::NotAvailable, Value::Str),
    }
}

/// Memory, CPU, storage and network rows. Missing counters read "Not available".
pub fn resource_rows(c: &ResourceCounters) -> Vec<ResourceRow> {
    use ResourceGroup::*;

    let mem = &c.memory;
    // used is derived when the probe only reports total and free
    let mem_used = mem
        .used_bytes
        .or_else(|| Some(mem.total_bytes?.saturating_sub(mem.free_bytes?)));
    let mem_pct = mem_used
        .zip(mem.total_bytes)
        .and_then(|(used, total)| format_percent(used, total));

    let disk = &c.storage;
    let disk_used = disk
        .total_bytes
        .zip(disk.free_bytes)
        .map(|(total, free)| total.saturating_sub(free));
    let disk_pct = disk_used
        .zip(disk.total_bytes)
        .and_then(|(used, total)| format_percent(used, total));

    vec![
        row(Memory, "Total RAM", mem.total_bytes.map(format_bytes)),
        row(Memory, "Available RAM", mem.free_bytes.map(format_bytes)),
        row(Memory, "Used RAM", mem_used.map(format_bytes)),
        row(Memory, "RAM Usage", mem_pct),
        row(Cpu, "CPU Model", c.cpu.model.clone()),
        row(Cpu, "CPU Cores", c.cpu.cores.map(|n| n.to_string())),
        row(Cpu, "CPU Load Average", c.cpu.load_average.as_ref().map(format_load_average)),
        row(Storage, "Total Disk Space", disk.total_bytes.map(format_bytes)),
        row(Storage, "Free Disk Space", disk.free_bytes.map(format_bytes)),
        row(Storage, "Used Disk Space", disk_used.map(format_bytes)),
        row(Storage, "Disk Usage", disk_pct),
        row(Network, "Hostname", c.network.hostname.clone()),
        row(Network, "Server IP", c.network.server_ip.clone()),
    ]
}
