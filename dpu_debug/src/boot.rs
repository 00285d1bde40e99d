use crate::{
    config::DpuDebugConfig,
    error::DpuError,
    host::{BreakpointId, HostSession, HostValue, StopReason},
    topology::RankHandle,
};

/// Cores caught right before they start, and the host frame that is about
/// to start them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootIntercept {
    pub addresses: Vec<u64>,
    pub frame: usize,
}

impl BootIntercept {
    fn nothing() -> Self {
        Self {
            addresses: Vec::new(),
            frame: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

enum LaunchKind {
    Rank,
    Dpu,
}

fn launch_kind(cfg: &DpuDebugConfig, function: &str) -> Option<LaunchKind> {
    if function == cfg.launch_rank_function {
        Some(LaunchKind::Rank)
    } else if function == cfg.launch_dpu_function {
        Some(LaunchKind::Dpu)
    } else {
        None
    }
}

/// Resumes the host until it is about to boot one or more DPUs.
///
/// Both launch breakpoints are removed before returning, whatever the
/// outcome. An empty result means the host stopped for another reason.
pub fn intercept_next_boot<H: HostSession>(
    host: &mut H,
    cfg: &DpuDebugConfig,
) -> Result<BootIntercept, DpuError> {
    let on_rank = host
        .create_breakpoint(&cfg.launch_rank_function)
        .map_err(DpuError::host)?;
    let on_dpu = match host.create_breakpoint(&cfg.launch_dpu_function) {
        Ok(id) => id,
        Err(err) => {
            host.delete_breakpoint(on_rank);
            return Err(DpuError::host(err));
        }
    };

    let stop = host.resume();
    for id in [on_rank, on_dpu] {
        if !host.delete_breakpoint(id) {
            log::warn!("launch breakpoint {} was already gone", id.0);
        }
    }

    match stop.map_err(DpuError::host)? {
        StopReason::Breakpoint(id) if is_one_of(id, [on_rank, on_dpu]) => {}
        other => {
            log::debug!("host stopped without booting a dpu: {:?}", other);
            return Ok(BootIntercept::nothing());
        }
    }

    for frame in 0..host.frame_count() {
        let Some(function) = host.frame_function(frame) else {
            continue;
        };
        let Some(kind) = launch_kind(cfg, &function) else {
            continue;
        };
        host.select_frame(frame);

        let addresses = match kind {
            LaunchKind::Rank => {
                let rank = host
                    .frame_variable(frame, "rank")
                    .and_then(RankHandle::from_pointer)
                    .ok_or_else(|| DpuError::Resolution("rank being launched".into()))?;
                let layout = rank.layout()?;
                (0..layout.dpu_count())
                    .map(|i| rank.dpu(i).map(|dpu| dpu.address()))
                    .collect::<Result<Vec<_>, _>>()?
            }
            LaunchKind::Dpu => {
                let dpu = host
                    .frame_variable(frame, "dpu")
                    .and_then(|value| value.unsigned())
                    .ok_or_else(|| DpuError::Resolution("dpu being launched".into()))?;
                vec![dpu]
            }
        };
        log::info!("{} about to boot {} dpu(s)", function, addresses.len());
        return Ok(BootIntercept { addresses, frame });
    }

    Ok(BootIntercept::nothing())
}

fn is_one_of(id: BreakpointId, ids: [BreakpointId; 2]) -> bool {
    ids.contains(&id)
}
