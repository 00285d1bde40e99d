//! Test doubles: a scripted host session, an in-memory stub speaking the
//! remote protocol and a writer for tiny DPU program binaries.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    io::Write,
    rc::Rc,
};

use gdb::{
    connection::Connection,
    packets::{
        psm::{Frame, PacketStateMachine},
        reply::decode_hex,
        writer::PacketWriter,
    },
};

use crate::{
    config::DpuDebugConfig,
    host::{BreakpointId, HostSession, HostValue, StopReason},
    stub::{CreateConnection, StubConfig, StubLauncher},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Evaluate(String),
    BreakpointSet(String),
    BreakpointDeleted(String),
    Resume,
    StepOut(usize),
    Spawn(StubConfig),
    Connect(String),
    RemoteWrite(u64, Vec<u8>),
    PrintInfo,
    Detach,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn position(events: &EventLog, pred: impl Fn(&Event) -> bool) -> Option<usize> {
    events.borrow().iter().position(pred)
}

//------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Node {
    Int(u64),
    Str(Option<String>),
    Struct { addr: u64, fields: Vec<(&'static str, Node)> },
    Array { addr: u64, items: Vec<Node> },
    Ptr(u64),
}

type Heap = Rc<HashMap<u64, Node>>;

#[derive(Clone)]
pub struct MockValue {
    heap: Heap,
    node: Node,
}

impl MockValue {
    fn wrap(&self, node: Node) -> Self {
        Self {
            heap: self.heap.clone(),
            node,
        }
    }

    fn deref(&self) -> Option<Node> {
        match &self.node {
            Node::Ptr(0) => None,
            Node::Ptr(target) => self.heap.get(target).cloned(),
            other => Some(other.clone()),
        }
    }
}

impl HostValue for MockValue {
    fn member(&self, name: &str) -> Option<Self> {
        match self.deref()? {
            Node::Struct { fields, .. } => fields
                .into_iter()
                .find(|(field, _)| *field == name)
                .map(|(_, node)| self.wrap(node)),
            _ => None,
        }
    }

    fn element(&self, index: usize) -> Option<Self> {
        match self.deref()? {
            Node::Array { items, .. } => items.get(index).cloned().map(|n| self.wrap(n)),
            node @ Node::Struct { .. } if index == 0 => Some(self.wrap(node)),
            _ => None,
        }
    }

    fn cast(&self, _type_name: &str) -> Option<Self> {
        Some(self.clone())
    }

    fn unsigned(&self) -> Option<u64> {
        match self.node {
            Node::Int(value) | Node::Ptr(value) => Some(value),
            _ => None,
        }
    }

    fn c_string(&self) -> Option<String> {
        match &self.node {
            Node::Str(value) => value.clone(),
            _ => None,
        }
    }

    fn address(&self) -> Option<u64> {
        match self.node {
            Node::Struct { addr, .. } | Node::Array { addr, .. } => Some(addr),
            _ => None,
        }
    }
}

fn index_structs(node: &Node, heap: &mut HashMap<u64, Node>) {
    match node {
        Node::Struct { addr, fields } => {
            if *addr != 0 {
                heap.insert(*addr, node.clone());
            }
            for (_, field) in fields {
                index_structs(field, heap);
            }
        }
        Node::Array { items, .. } => {
            for item in items {
                index_structs(item, heap);
            }
        }
        _ => {}
    }
}

//------------------------------------------------------------------------

/// Descriptor of one rank as the host runtime lays it out.
#[derive(Debug, Clone)]
pub struct MockRank {
    pub addr: u64,
    pub path: Option<String>,
    pub slice_count: u64,
    pub dpus_per_slice: u64,
    pub running: Vec<u64>,
    pub fault: Vec<u64>,
    pub disabled: Vec<usize>,
    pub program: Option<String>,
    pub structure_value: u64,
    pub host_mux_mram_state: u64,
    pub target_type: u64,
    pub target_group: u64,
    /// Replaces the `dpu_id` the runtime would store for every DPU.
    pub raw_dpu_id: Option<u64>,
}

impl MockRank {
    pub fn new(addr: u64, region: u32, rank: u32, slice_count: u64, dpus_per_slice: u64) -> Self {
        Self {
            addr,
            path: Some(format!(
                "/sys/devices/platform/dpu_region_mem.{region}/dpu_region{region}/dpu_rank{rank}"
            )),
            slice_count,
            dpus_per_slice,
            running: vec![0; slice_count as usize],
            fault: vec![0; slice_count as usize],
            disabled: Vec::new(),
            program: None,
            structure_value: 0x3f,
            host_mux_mram_state: 0,
            target_type: 2,
            target_group: 1,
            raw_dpu_id: None,
        }
    }

    pub fn dpu_addr(&self, index: usize) -> u64 {
        self.addr + 0x1000 + index as u64 * 0x100
    }

    fn dpu_node(&self, index: usize) -> Node {
        let per_slice = self.dpus_per_slice as usize;
        Node::Struct {
            addr: self.dpu_addr(index),
            fields: vec![
                ("enabled", Node::Int(!self.disabled.contains(&index) as u64)),
                ("slice_id", Node::Int((index / per_slice) as u64)),
                (
                    "dpu_id",
                    Node::Int(self.raw_dpu_id.unwrap_or((index % per_slice) as u64)),
                ),
                (
                    "program",
                    Node::Struct {
                        addr: 0,
                        fields: vec![("program_path", Node::Str(self.program.clone()))],
                    },
                ),
                ("rank", Node::Ptr(self.addr)),
            ],
        }
    }

    fn node(&self) -> Node {
        let ints = |values: &[u64]| Node::Array {
            addr: 0,
            items: values.iter().map(|v| Node::Int(*v)).collect(),
        };
        let slice_info = (0..self.slice_count)
            .map(|_| Node::Struct {
                addr: 0,
                fields: vec![
                    ("structure_value", Node::Int(self.structure_value)),
                    ("host_mux_mram_state", Node::Int(self.host_mux_mram_state)),
                    (
                        "slice_target",
                        Node::Struct {
                            addr: 0,
                            fields: vec![
                                ("type", Node::Int(self.target_type)),
                                ("dpu_id", Node::Int(self.target_group)),
                            ],
                        },
                    ),
                ],
            })
            .collect();
        let dpu_count = (self.slice_count * self.dpus_per_slice) as usize;

        Node::Struct {
            addr: self.addr,
            fields: vec![
                (
                    "description",
                    Node::Struct {
                        addr: 0,
                        fields: vec![
                            (
                                "_internals",
                                Node::Struct {
                                    addr: 0,
                                    fields: vec![(
                                        "data",
                                        Node::Struct {
                                            addr: 0,
                                            fields: vec![(
                                                "rank_fs",
                                                Node::Struct {
                                                    addr: 0,
                                                    fields: vec![(
                                                        "rank_path",
                                                        Node::Str(self.path.clone()),
                                                    )],
                                                },
                                            )],
                                        },
                                    )],
                                },
                            ),
                            (
                                "topology",
                                Node::Struct {
                                    addr: 0,
                                    fields: vec![
                                        ("nr_of_control_interfaces", Node::Int(self.slice_count)),
                                        (
                                            "nr_of_dpus_per_control_interface",
                                            Node::Int(self.dpus_per_slice),
                                        ),
                                    ],
                                },
                            ),
                        ],
                    },
                ),
                (
                    "runtime",
                    Node::Struct {
                        addr: 0,
                        fields: vec![
                            (
                                "run_context",
                                Node::Struct {
                                    addr: 0,
                                    fields: vec![
                                        ("dpu_running", ints(&self.running)),
                                        ("dpu_in_fault", ints(&self.fault)),
                                    ],
                                },
                            ),
                            (
                                "control_interface",
                                Node::Struct {
                                    addr: 0,
                                    fields: vec![(
                                        "slice_info",
                                        Node::Array {
                                            addr: 0,
                                            items: slice_info,
                                        },
                                    )],
                                },
                            ),
                        ],
                    },
                ),
                (
                    "dpus",
                    Node::Array {
                        addr: self.dpu_addr(0),
                        items: (0..dpu_count).map(|i| self.dpu_node(i)).collect(),
                    },
                ),
            ],
        }
    }
}

//------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MockFrame {
    pub function: String,
    pub vars: Vec<(&'static str, Node)>,
}

impl MockFrame {
    pub fn new(function: &str) -> Self {
        Self {
            function: function.into(),
            vars: Vec::new(),
        }
    }

    pub fn var(mut self, name: &'static str, node: Node) -> Self {
        self.vars.push((name, node));
        self
    }
}

/// What the host does the next time it is resumed.
#[derive(Debug, Clone)]
pub struct MockStop {
    /// Function whose breakpoint is reported as hit, if any.
    pub hit: Option<String>,
    pub frames: Vec<MockFrame>,
}

type Globals = HashMap<String, Node>;

/// Heap and globals of a host process holding `ranks` in its rank list.
/// `None` entries are slots that were never initialised.
fn host_memory(ranks: &[Option<MockRank>]) -> (Heap, Globals) {
    let mut heap = HashMap::new();
    let mut list = Vec::new();
    for rank in ranks {
        match rank {
            Some(rank) => {
                index_structs(&rank.node(), &mut heap);
                list.push(Node::Ptr(rank.addr));
            }
            None => list.push(Node::Ptr(0)),
        }
    }

    let cfg = DpuDebugConfig::default();
    let mut globals = HashMap::new();
    globals.insert(cfg.rank_list_size_symbol, Node::Int(ranks.len() as u64));
    globals.insert(
        cfg.rank_list_symbol,
        Node::Array {
            addr: 0x10,
            items: list,
        },
    );
    (Rc::new(heap), globals)
}

pub struct MockHost {
    heap: Heap,
    types: HashSet<String>,
    globals: Globals,
    /// Memory the process holds once it has run up to its first stop.
    allocated_later: Option<(Heap, Globals)>,
    expressions: HashMap<String, u64>,
    pub triple: String,
    pub events: EventLog,
    pub failing_expressions: Vec<String>,
    pub stops: VecDeque<MockStop>,
    frames: Vec<MockFrame>,
    pub selected_frame: Option<usize>,
    breakpoints: HashMap<u32, String>,
    next_breakpoint: u32,
}

impl MockHost {
    /// A host process with `ranks` allocated in the rank list.
    pub fn new(ranks: &[Option<MockRank>], hardware: bool, events: &EventLog) -> Self {
        let (heap, globals) = host_memory(ranks);
        let mut types = HashSet::new();
        if hardware {
            types.insert(DpuDebugConfig::default().allocation_parameters_type);
        }

        Self {
            heap,
            types,
            globals,
            allocated_later: None,
            expressions: HashMap::new(),
            triple: "x86_64-unknown-linux-gnu".into(),
            events: events.clone(),
            failing_expressions: Vec::new(),
            stops: VecDeque::new(),
            frames: vec![MockFrame::new("main")],
            selected_frame: None,
            breakpoints: HashMap::new(),
            next_breakpoint: 1,
        }
    }

    pub fn with_expression(mut self, expression: &str, value: u64) -> Self {
        self.expressions.insert(expression.into(), value);
        self
    }

    /// Starts out with a single uninitialised rank slot. The ranks given
    /// to `new` are only allocated once the process is resumed.
    pub fn allocate_on_resume(mut self) -> Self {
        let (heap, globals) = host_memory(&[None]);
        let heap = std::mem::replace(&mut self.heap, heap);
        let globals = std::mem::replace(&mut self.globals, globals);
        self.allocated_later = Some((heap, globals));
        self
    }

    pub fn fail_expressions_containing(mut self, pattern: &str) -> Self {
        self.failing_expressions.push(pattern.into());
        self
    }

    pub fn live_breakpoints(&self) -> usize {
        self.breakpoints.len()
    }

    fn value(&self, node: Node) -> MockValue {
        MockValue {
            heap: self.heap.clone(),
            node,
        }
    }
}

impl HostSession for MockHost {
    type Value = MockValue;
    type Error = String;

    fn triple(&self) -> String {
        self.triple.clone()
    }

    fn has_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    fn global(&self, name: &str) -> Option<MockValue> {
        self.globals.get(name).cloned().map(|n| self.value(n))
    }

    fn pointer_to(&self, _type_name: &str, address: u64) -> Option<MockValue> {
        Some(self.value(Node::Ptr(address)))
    }

    fn evaluate(&mut self, expression: &str) -> Result<Option<u64>, String> {
        self.events
            .borrow_mut()
            .push(Event::Evaluate(expression.into()));
        if self
            .failing_expressions
            .iter()
            .any(|p| expression.contains(p.as_str()))
        {
            return Err(format!("error: cannot evaluate '{}'", expression));
        }
        if let Some(value) = self.expressions.get(expression) {
            return Ok(Some(*value));
        }
        let local = self
            .selected_frame
            .and_then(|frame| self.frame_variable(frame, expression))
            .and_then(|value| value.unsigned());
        if let Some(value) = local {
            return Ok(Some(value));
        }
        if expression.starts_with(&DpuDebugConfig::default().debug_mode_function) {
            return Ok(Some(0));
        }
        Err(format!("error: use of undeclared identifier '{}'", expression))
    }

    fn create_breakpoint(&mut self, function: &str) -> Result<BreakpointId, String> {
        let id = self.next_breakpoint;
        self.next_breakpoint += 1;
        self.breakpoints.insert(id, function.into());
        self.events
            .borrow_mut()
            .push(Event::BreakpointSet(function.into()));
        Ok(BreakpointId(id))
    }

    fn delete_breakpoint(&mut self, id: BreakpointId) -> bool {
        match self.breakpoints.remove(&id.0) {
            Some(function) => {
                self.events
                    .borrow_mut()
                    .push(Event::BreakpointDeleted(function));
                true
            }
            None => false,
        }
    }

    fn resume(&mut self) -> Result<StopReason, String> {
        self.events.borrow_mut().push(Event::Resume);
        if let Some((heap, globals)) = self.allocated_later.take() {
            self.heap = heap;
            self.globals = globals;
        }
        let stop = match self.stops.pop_front() {
            Some(stop) => stop,
            None => return Ok(StopReason::Exited(0)),
        };
        self.frames = stop.frames;
        self.selected_frame = None;
        let hit = stop.hit.and_then(|function| {
            self.breakpoints
                .iter()
                .find(|(_, f)| **f == function)
                .map(|(id, _)| BreakpointId(*id))
        });
        Ok(match hit {
            Some(id) => StopReason::Breakpoint(id),
            None => StopReason::Signal(2),
        })
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame_function(&self, frame: usize) -> Option<String> {
        self.frames.get(frame).map(|f| f.function.clone())
    }

    fn frame_variable(&self, frame: usize, name: &str) -> Option<MockValue> {
        self.frames
            .get(frame)?
            .vars
            .iter()
            .find(|(var, _)| *var == name)
            .map(|(_, node)| self.value(node.clone()))
    }

    fn select_frame(&mut self, frame: usize) {
        self.selected_frame = Some(frame);
    }

    fn step_out_of_frame(&mut self, frame: usize) -> Result<(), String> {
        self.events.borrow_mut().push(Event::StepOut(frame));
        Ok(())
    }
}

//------------------------------------------------------------------------

pub struct RecordingLauncher {
    pub events: EventLog,
    /// Spawn attempts (0 based) that fail.
    pub fail_on: Vec<usize>,
    attempts: usize,
}

impl RecordingLauncher {
    pub fn new(events: &EventLog) -> Self {
        Self {
            events: events.clone(),
            fail_on: Vec::new(),
            attempts: 0,
        }
    }
}

impl StubLauncher for RecordingLauncher {
    type Error = String;

    fn spawn(&mut self, config: &StubConfig, _port: u16) -> Result<(), String> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_on.contains(&attempt) {
            return Err("lldb-server-dpu: not found".into());
        }
        self.events.borrow_mut().push(Event::Spawn(*config));
        Ok(())
    }
}

//------------------------------------------------------------------------

/// DPU side state that outlives any single connection.
#[derive(Debug, Default)]
pub struct StubState {
    pub memory: HashMap<u64, u8>,
    pub print_info: Option<Vec<u64>>,
    pub refuse_print_info: bool,
    pub refuse_connections: bool,
    /// Memory writes accepted before every further one fails.
    pub writes_allowed: Option<usize>,
}

pub type SharedStub = Rc<RefCell<StubState>>;

impl StubState {
    pub fn shared() -> SharedStub {
        Rc::new(RefCell::new(StubState::default()))
    }

    pub fn read(&self, addr: u64, len: usize) -> Vec<u8> {
        (0..len as u64)
            .map(|i| *self.memory.get(&(addr + i)).unwrap_or(&0))
            .collect()
    }

    pub fn write(&mut self, addr: u64, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.memory.insert(addr + i as u64, *b);
        }
    }
}

pub struct FakeStub {
    state: SharedStub,
    events: EventLog,
    ptm: PacketStateMachine,
    outbox: VecDeque<u8>,
    no_ack_mode: bool,
}

impl FakeStub {
    pub fn new(state: &SharedStub, events: &EventLog) -> Self {
        Self {
            state: state.clone(),
            events: events.clone(),
            ptm: PacketStateMachine::new(),
            outbox: VecDeque::new(),
            no_ack_mode: false,
        }
    }

    fn answer(&mut self, request: &str) -> String {
        let mut state = self.state.borrow_mut();
        if request == "QStartNoAckMode" || request == "D" {
            if request == "D" {
                self.events.borrow_mut().push(Event::Detach);
            }
            return "OK".into();
        }
        if request == "?" {
            return "S05".into();
        }
        if let Some(args) = request.strip_prefix('m') {
            let Some((addr, len)) = args.split_once(',') else {
                return "E01".into();
            };
            let addr = u64::from_str_radix(addr, 16).unwrap_or(0);
            let len = usize::from_str_radix(len, 16).unwrap_or(0);
            return state
                .read(addr, len)
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect();
        }
        if let Some(args) = request.strip_prefix('M') {
            let parsed = args.split_once(',').and_then(|(addr, rest)| {
                let (_, data) = rest.split_once(':')?;
                Some((u64::from_str_radix(addr, 16).ok()?, decode_hex(data.as_bytes()).ok()?))
            });
            let Some((addr, data)) = parsed else {
                return "E01".into();
            };
            match state.writes_allowed {
                Some(0) => return "E0e".into(),
                Some(left) => state.writes_allowed = Some(left - 1),
                None => {}
            }
            state.write(addr, &data);
            self.events
                .borrow_mut()
                .push(Event::RemoteWrite(addr, data));
            return "OK".into();
        }
        if let Some(args) = request.strip_prefix("QDpuPrintInfo:") {
            if state.refuse_print_info {
                return String::new();
            }
            state.print_info = Some(
                args.split(',')
                    .filter_map(|v| u64::from_str_radix(v, 16).ok())
                    .collect(),
            );
            self.events.borrow_mut().push(Event::PrintInfo);
            return "OK".into();
        }
        String::new()
    }
}

impl Connection for FakeStub {
    type Error = String;

    fn write(&mut self, byte: u8) -> Result<(), String> {
        let request = match self.ptm.incomming_data(byte) {
            Some(Frame::Packet(body)) => String::from_utf8_lossy(body).into_owned(),
            _ => return Ok(()),
        };
        if !self.no_ack_mode {
            self.outbox.push_back(b'+');
        }
        let reply = self.answer(&request);
        let mut w = PacketWriter::new();
        w.write_str(&reply);
        self.outbox.extend(w.finish());
        if request == "QStartNoAckMode" {
            self.no_ack_mode = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn on_session_start(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn on_session_end(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn read(&mut self) -> Result<u8, String> {
        self.outbox
            .pop_front()
            .ok_or_else(|| "stub has nothing to say".to_string())
    }
}

pub fn fake_connector(state: &SharedStub, events: &EventLog) -> CreateConnection<FakeStub> {
    let state = state.clone();
    let events = events.clone();
    Box::new(
        move |endpoint: &str| -> Result<Option<FakeStub>, Box<dyn std::error::Error>> {
            events
                .borrow_mut()
                .push(Event::Connect(endpoint.to_string()));
            if state.borrow().refuse_connections {
                return Ok(None);
            }
            Ok(Some(FakeStub::new(&state, &events)))
        },
    )
}

//------------------------------------------------------------------------

/// Builds a little-endian ELF32 image holding only a symbol table.
pub fn program_elf(functions: &[(&str, u32)], objects: &[(&str, u32)]) -> Vec<u8> {
    const EHSIZE: usize = 52;
    const SHENTSIZE: usize = 40;
    const SYMSIZE: usize = 16;

    let mut strtab = vec![0u8];
    let mut symtab = vec![0u8; SYMSIZE];
    let kinds = functions
        .iter()
        .map(|s| (s, 2u8))
        .chain(objects.iter().map(|s| (s, 1u8)));
    for ((name, value), kind) in kinds {
        let name_offset = strtab.len() as u32;
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);

        symtab.extend_from_slice(&name_offset.to_le_bytes());
        symtab.extend_from_slice(&value.to_le_bytes());
        symtab.extend_from_slice(&4u32.to_le_bytes());
        // global binding in the high nibble
        symtab.push((1 << 4) | kind);
        symtab.push(0);
        symtab.extend_from_slice(&0xfff1u16.to_le_bytes());
    }
    let shstrtab = b"\0.strtab\0.symtab\0.shstrtab\0".to_vec();

    let align = |n: usize| (n + 3) & !3;
    let strtab_off = EHSIZE;
    let symtab_off = align(strtab_off + strtab.len());
    let shstrtab_off = symtab_off + symtab.len();
    let sh_off = align(shstrtab_off + shstrtab.len());

    let mut out = Vec::new();
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&2u16.to_le_bytes()); // e_type
    out.extend_from_slice(&0u16.to_le_bytes()); // e_machine
    out.extend_from_slice(&1u32.to_le_bytes()); // e_version
    out.extend_from_slice(&0x8000_0000u32.to_le_bytes()); // e_entry
    out.extend_from_slice(&0u32.to_le_bytes()); // e_phoff
    out.extend_from_slice(&(sh_off as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&(EHSIZE as u16).to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
    out.extend_from_slice(&(SHENTSIZE as u16).to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes()); // e_shnum
    out.extend_from_slice(&3u16.to_le_bytes()); // e_shstrndx

    out.extend_from_slice(&strtab);
    out.resize(symtab_off, 0);
    out.extend_from_slice(&symtab);
    out.extend_from_slice(&shstrtab);
    out.resize(sh_off, 0);

    // name, type, flags, addr, offset, size, link, info, addralign, entsize
    let sections: [[u32; 10]; 4] = [
        [0; 10],
        [1, 3, 0, 0, strtab_off as u32, strtab.len() as u32, 0, 0, 1, 0],
        [
            9,
            2,
            0,
            0,
            symtab_off as u32,
            symtab.len() as u32,
            1,
            1,
            4,
            SYMSIZE as u32,
        ],
        [17, 3, 0, 0, shstrtab_off as u32, shstrtab.len() as u32, 0, 0, 1, 0],
    ];
    for section in sections {
        for field in section {
            out.extend_from_slice(&field.to_le_bytes());
        }
    }
    out
}

pub const PRINT_FUNCTIONS: [(&str, u32); 2] = [
    ("__open_print_sequence", 0x8000_0100),
    ("__close_print_sequence", 0x8000_0200),
];

pub const PRINT_OBJECTS: [(&str, u32); 3] = [
    ("__stdout_buffer", 0x400),
    ("__stdout_buffer_size", 0x300),
    ("__stdout_buffer_state", 0x310),
];

pub fn write_program(functions: &[(&str, u32)], objects: &[(&str, u32)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&program_elf(functions, objects)).unwrap();
    file.flush().unwrap();
    file
}
