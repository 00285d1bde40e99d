use std::{fmt, io};

use crate::{
    config::DpuDebugConfig,
    error::DpuError,
    host::{HostSession, HostValue},
    topology::{DpuStatus, RankHandle},
};

/// One enabled DPU as seen from the host runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpuRecord {
    pub address: u64,
    /// `None` when the rank is not backed by hardware.
    pub region_id: Option<u32>,
    pub rank_id: Option<u32>,
    pub slice_id: u32,
    pub dpu_id: u32,
    pub status: DpuStatus,
    pub program_path: Option<String>,
}

/// `region.rank.slice.dpu`, with `-1` for unknown components.
pub struct DottedId<'a>(&'a DpuRecord);

impl fmt::Display for DottedId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = |id: Option<u32>| id.map_or(-1, |id| id as i64);
        write!(
            f,
            "{}.{}.{}.{}",
            unknown(self.0.region_id),
            unknown(self.0.rank_id),
            self.0.slice_id,
            self.0.dpu_id
        )
    }
}

impl DpuRecord {
    pub fn id(&self) -> DottedId<'_> {
        DottedId(self)
    }
}

/// Walks every allocated rank and reports its enabled DPUs.
pub fn list_dpus<H: HostSession>(host: &H, cfg: &DpuDebugConfig) -> Result<Vec<DpuRecord>, DpuError> {
    let rank_count = host
        .global(&cfg.rank_list_size_symbol)
        .and_then(|v| v.unsigned())
        .ok_or_else(|| DpuError::Resolution("number of ranks".into()))?;
    let rank_list = host
        .global(&cfg.rank_list_symbol)
        .ok_or_else(|| DpuError::Resolution("rank list".into()))?;

    let mut records = Vec::new();
    for index in 0..rank_count as usize {
        let Some(rank) = rank_list.element(index).and_then(RankHandle::from_pointer) else {
            log::debug!("rank slot {} is not initialised", index);
            continue;
        };
        let coordinate = rank.coordinate(host, cfg)?;
        let layout = rank.layout()?;

        for slice_id in 0..layout.slice_count {
            let (running, fault) = rank.slice_masks(slice_id)?;
            for dpu_id in 0..layout.dpus_per_slice {
                let dpu = rank.dpu((slice_id * layout.dpus_per_slice + dpu_id) as usize)?;
                if !dpu.enabled()? {
                    continue;
                }
                records.push(DpuRecord {
                    address: dpu.address(),
                    region_id: coordinate.map(|c| c.region_id),
                    rank_id: coordinate.map(|c| c.rank_id),
                    slice_id,
                    dpu_id,
                    status: DpuStatus::resolve(running, fault, dpu_id),
                    program_path: dpu.program_path()?,
                });
            }
        }
    }
    Ok(records)
}

pub fn write_table(out: &mut impl io::Write, records: &[DpuRecord]) -> io::Result<()> {
    writeln!(out, "{:<20}{:<16}{:<10}PROGRAM", "ADDR", "ID", "STATUS")?;
    for record in records {
        writeln!(
            out,
            "{:<20}{:<16}{:<10}'{}'",
            format!("{:#x}", record.address),
            record.id().to_string(),
            record.status.to_string(),
            record.program_path.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}
