use std::time::Duration;

/// Architecture triple carried by every DPU debug target.
pub const DPU_TRIPLE: &str = "dpu-upmem-dpurte";

/// Start of the DPU instruction memory, where a booting core fetches first.
pub const DPU_IRAM_BASE: u64 = 0x8000_0000;

/// Names, endpoints and bounds used while attaching to DPUs.
#[derive(Debug, Clone)]
pub struct DpuDebugConfig {
    pub stub_program: String,
    pub stub_host: String,
    pub stub_port: u16,
    pub dpu_triple: String,

    pub rank_list_symbol: String,
    pub rank_list_size_symbol: String,
    pub allocation_parameters_type: String,
    pub dpu_type: String,
    pub rank_type: String,
    pub debug_mode_function: String,

    pub launch_rank_function: String,
    pub launch_dpu_function: String,

    pub entry_address: u64,
    pub entry_trap: [u8; 8],

    /// Boot events inspected by attach-on-boot before giving up.
    pub max_boot_intercepts: usize,
    pub connect_attempts: usize,
    pub connect_retry_delay: Duration,
}

impl Default for DpuDebugConfig {
    fn default() -> Self {
        Self {
            stub_program: "lldb-server-dpu".into(),
            stub_host: "localhost".into(),
            stub_port: 2066,
            dpu_triple: DPU_TRIPLE.into(),

            rank_list_symbol: "dpu_rank_handler_dpu_rank_list".into(),
            rank_list_size_symbol: "dpu_rank_handler_dpu_rank_list_size".into(),
            allocation_parameters_type: "hw_dpu_rank_allocation_parameters_t".into(),
            dpu_type: "struct dpu_t".into(),
            rank_type: "dpu_rank_t".into(),
            debug_mode_function: "hw_set_debug_mode".into(),

            launch_rank_function: "dpu_launch_thread_on_rank".into(),
            launch_dpu_function: "dpu_launch_thread_on_dpu".into(),

            entry_address: DPU_IRAM_BASE,
            entry_trap: [0x00, 0x00, 0x00, 0x20, 0x63, 0x7e, 0x00, 0x00],

            max_boot_intercepts: 64,
            connect_attempts: 50,
            connect_retry_delay: Duration::from_millis(100),
        }
    }
}

impl DpuDebugConfig {
    /// `host:port` the stub listens on.
    pub fn stub_endpoint(&self) -> String {
        format!("{}:{}", self.stub_host, self.stub_port)
    }
}
