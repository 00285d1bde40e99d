use std::fmt;

use thiserror::Error;

/// Each coordinate component occupies one base-100 digit of the pid.
pub const COMPONENT_LIMIT: u32 = 100;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidError {
    #[error("{component} id {value} does not fit in a dpu pid (must be < 100)")]
    ComponentOutOfRange { component: &'static str, value: u32 },
    #[error("{0} is not a dpu pid")]
    NotADpuPid(u64),
}

/// Hardware coordinate of one DPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DpuCoordinate {
    pub region_id: u32,
    pub rank_id: u32,
    pub slice_id: u32,
    pub dpu_id: u32,
}

impl fmt::Display for DpuCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.region_id, self.rank_id, self.slice_id, self.dpu_id
        )
    }
}

/// Synthetic process id the debug stub uses to address one DPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalPid(pub u64);

impl GlobalPid {
    /// `dpu + 100 * (slice + 100 * (rank + 100 * (region + 100)))`
    pub fn encode(coord: DpuCoordinate) -> Result<Self, PidError> {
        let check = |component, value: u32| {
            if value < COMPONENT_LIMIT {
                Ok(value as u64)
            } else {
                Err(PidError::ComponentOutOfRange { component, value })
            }
        };
        let region = check("region", coord.region_id)?;
        let rank = check("rank", coord.rank_id)?;
        let slice = check("slice", coord.slice_id)?;
        let dpu = check("dpu", coord.dpu_id)?;

        let base = COMPONENT_LIMIT as u64;
        Ok(GlobalPid(
            dpu + base * (slice + base * (rank + base * (region + base))),
        ))
    }

    pub fn decode(self) -> Result<DpuCoordinate, PidError> {
        let base = COMPONENT_LIMIT as u64;
        let mut rest = self.0;
        let mut digit = || {
            let d = (rest % base) as u32;
            rest /= base;
            d
        };
        let dpu_id = digit();
        let slice_id = digit();
        let rank_id = digit();
        let region_id = digit();
        // the leading digit is the constant offset folded in by `encode`
        if rest != 1 {
            return Err(PidError::NotADpuPid(self.0));
        }
        Ok(DpuCoordinate {
            region_id,
            rank_id,
            slice_id,
            dpu_id,
        })
    }
}

impl fmt::Display for GlobalPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
