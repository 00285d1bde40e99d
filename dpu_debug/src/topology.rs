//! Reads the rank and DPU descriptors the host runtime keeps in its own
//! memory.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use thiserror::Error;

use crate::{
    config::DpuDebugConfig,
    error::DpuError,
    host::{HostSession, HostValue},
    pid::DpuCoordinate,
};

/// Topology counts are 8 bit fields in the rank descriptor.
const TOPOLOGY_MASK: u64 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankCoordinate {
    pub region_id: u32,
    pub rank_id: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparseable rank path '{0}'")]
pub struct UnparseableRankPath(pub String);

/// Parses the sysfs path of a rank, `.../dpu_region<R>/.../dpu_rank<K>`.
pub fn parse_rank_path(path: &str) -> Result<RankCoordinate, UnparseableRankPath> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"dpu_region(\d+)/.*dpu_rank(\d+)").expect("rank path pattern is valid")
    });

    let unparseable = || UnparseableRankPath(path.to_string());
    let captures = pattern.captures(path).ok_or_else(unparseable)?;
    let number = |i: usize| captures[i].parse::<u32>().map_err(|_| unparseable());
    Ok(RankCoordinate {
        region_id: number(1)?,
        rank_id: number(2)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceLayout {
    pub slice_count: u32,
    pub dpus_per_slice: u32,
}

impl SliceLayout {
    pub fn dpu_count(&self) -> usize {
        self.slice_count as usize * self.dpus_per_slice as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpuStatus {
    Running,
    Error,
    Idle,
}

impl DpuStatus {
    /// Status of core `dpu_id` given the bitmasks of its slice. A running
    /// bit wins over a fault bit.
    pub fn resolve(running_mask: u64, fault_mask: u64, dpu_id: u32) -> Self {
        let bit = 1u64.checked_shl(dpu_id).unwrap_or(0);
        if running_mask & bit != 0 {
            DpuStatus::Running
        } else if fault_mask & bit != 0 {
            DpuStatus::Error
        } else {
            DpuStatus::Idle
        }
    }
}

impl fmt::Display for DpuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DpuStatus::Running => "RUNNING",
            DpuStatus::Error => "ERROR",
            DpuStatus::Idle => "IDLE",
        })
    }
}

/// Out-of-band values the stub needs for one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceDescriptor {
    pub structure_value: u64,
    /// `(target_type << 32) | target_group_id`
    pub slice_target: u64,
    pub host_mux_mram_state: u64,
}

fn child<V: HostValue>(value: &V, path: &[&str]) -> Result<V, DpuError> {
    let mut current = value.clone();
    for name in path {
        current = current
            .member(name)
            .ok_or_else(|| DpuError::Resolution(path.join(".")))?;
    }
    Ok(current)
}

fn unsigned<V: HostValue>(value: &V, what: &str) -> Result<u64, DpuError> {
    value
        .unsigned()
        .ok_or_else(|| DpuError::Resolution(what.to_string()))
}

/// Read-only view of one rank descriptor.
#[derive(Clone)]
pub struct RankHandle<V> {
    value: V,
    address: u64,
}

impl<V: HostValue> RankHandle<V> {
    /// Wraps a `dpu_rank_t *`; `None` for a null pointer (slot not yet
    /// initialised).
    pub fn from_pointer(value: V) -> Option<Self> {
        match value.unsigned() {
            Some(0) | None => None,
            Some(address) => Some(Self { value, address }),
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// Region and rank ids, or `None` when the host has no hardware
    /// allocation parameters (simulator backend).
    pub fn coordinate<H>(
        &self,
        host: &H,
        cfg: &DpuDebugConfig,
    ) -> Result<Option<RankCoordinate>, DpuError>
    where
        H: HostSession<Value = V>,
    {
        if !host.has_type(&cfg.allocation_parameters_type) {
            log::debug!(
                "no {} in host debug info, rank {:#x} is not hardware",
                cfg.allocation_parameters_type,
                self.address
            );
            return Ok(None);
        }
        let params = child(&self.value, &["description", "_internals", "data"])?
            .cast(&format!("{} *", cfg.allocation_parameters_type))
            .ok_or_else(|| DpuError::Resolution(cfg.allocation_parameters_type.clone()))?;
        let path = child(&params, &["rank_fs", "rank_path"])?
            .c_string()
            .ok_or_else(|| DpuError::Resolution("rank path".into()))?;
        parse_rank_path(&path)
            .map(Some)
            .map_err(|err| DpuError::Resolution(err.to_string()))
    }

    pub fn layout(&self) -> Result<SliceLayout, DpuError> {
        let topology = child(&self.value, &["description", "topology"])?;
        let count = |name: &str| -> Result<u32, DpuError> {
            let value = child(&topology, &[name])?;
            Ok((unsigned(&value, name)? & TOPOLOGY_MASK) as u32)
        };
        Ok(SliceLayout {
            slice_count: count("nr_of_control_interfaces")?,
            dpus_per_slice: count("nr_of_dpus_per_control_interface")?,
        })
    }

    /// `(running_mask, fault_mask)` of one slice.
    pub fn slice_masks(&self, slice: u32) -> Result<(u64, u64), DpuError> {
        let run_context = child(&self.value, &["runtime", "run_context"])?;
        let mask = |name: &str| -> Result<u64, DpuError> {
            let element = child(&run_context, &[name])?
                .element(slice as usize)
                .ok_or_else(|| DpuError::Resolution(format!("{}[{}]", name, slice)))?;
            unsigned(&element, name)
        };
        Ok((mask("dpu_running")?, mask("dpu_in_fault")?))
    }

    pub fn slice_descriptor(&self, slice: u32) -> Result<SliceDescriptor, DpuError> {
        let info = child(&self.value, &["runtime", "control_interface", "slice_info"])?
            .element(slice as usize)
            .ok_or_else(|| DpuError::Resolution(format!("slice_info[{}]", slice)))?;
        let read = |path: &[&str]| unsigned(&child(&info, path)?, &path.join("."));

        let target_type = read(&["slice_target", "type"])?;
        let target_group = read(&["slice_target", "dpu_id"])?;
        Ok(SliceDescriptor {
            structure_value: read(&["structure_value"])?,
            slice_target: (target_type << 32) | (target_group & 0xffff_ffff),
            host_mux_mram_state: read(&["host_mux_mram_state"])?,
        })
    }

    pub fn dpu(&self, index: usize) -> Result<DpuHandle<V>, DpuError> {
        let value = child(&self.value, &["dpus"])?
            .element(index)
            .ok_or_else(|| DpuError::Resolution(format!("dpus[{}]", index)))?;
        DpuHandle::from_object(value)
    }
}

/// Read-only view of one `struct dpu_t`.
#[derive(Clone)]
pub struct DpuHandle<V> {
    value: V,
    address: u64,
}

impl<V: HostValue> DpuHandle<V> {
    pub fn from_pointer<H>(host: &H, cfg: &DpuDebugConfig, address: u64) -> Result<Self, DpuError>
    where
        H: HostSession<Value = V>,
    {
        let value = host
            .pointer_to(&format!("{} *", cfg.dpu_type), address)
            .ok_or_else(|| DpuError::Resolution(format!("dpu at {:#x}", address)))?;
        Ok(Self { value, address })
    }

    pub fn from_object(value: V) -> Result<Self, DpuError> {
        let address = value
            .address()
            .ok_or_else(|| DpuError::Resolution("dpu address".into()))?;
        Ok(Self { value, address })
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    fn read(&self, name: &str) -> Result<u64, DpuError> {
        unsigned(&child(&self.value, &[name])?, name)
    }

    fn read_id(&self, name: &str) -> Result<u32, DpuError> {
        let value = self.read(name)?;
        u32::try_from(value).map_err(|_| {
            DpuError::Resolution(format!(
                "{} of dpu {:#x} ({} is out of range)",
                name, self.address, value
            ))
        })
    }

    pub fn slice_id(&self) -> Result<u32, DpuError> {
        self.read_id("slice_id")
    }

    pub fn dpu_id(&self) -> Result<u32, DpuError> {
        self.read_id("dpu_id")
    }

    pub fn enabled(&self) -> Result<bool, DpuError> {
        Ok(self.read("enabled")? != 0)
    }

    /// Path of the loaded program, `None` when nothing is loaded.
    pub fn program_path(&self) -> Result<Option<String>, DpuError> {
        let path = child(&self.value, &["program", "program_path"])?.c_string();
        Ok(path.filter(|p| !p.is_empty()))
    }

    pub fn rank(&self) -> Result<RankHandle<V>, DpuError> {
        RankHandle::from_pointer(child(&self.value, &["rank"])?)
            .ok_or_else(|| DpuError::Resolution(format!("rank of dpu {:#x}", self.address)))
    }

    /// Full hardware coordinate, `None` on a non-hardware target.
    pub fn coordinate<H>(
        &self,
        host: &H,
        cfg: &DpuDebugConfig,
    ) -> Result<Option<DpuCoordinate>, DpuError>
    where
        H: HostSession<Value = V>,
    {
        let rank = match self.rank()?.coordinate(host, cfg)? {
            Some(rank) => rank,
            None => return Ok(None),
        };
        Ok(Some(DpuCoordinate {
            region_id: rank.region_id,
            rank_id: rank.rank_id,
            slice_id: self.slice_id()?,
            dpu_id: self.dpu_id()?,
        }))
    }
}
