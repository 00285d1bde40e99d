//! Debug target for one DPU, backed by the remote session to its stub.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use gdb::{
    client::RemoteClient,
    connection::Connection,
    packets::reply::StopReply,
};
use xmas_elf::{
    sections::SectionData,
    symbol_table::{Entry, Type},
    ElfFile,
};

use crate::error::DpuError;

/// Named function and object addresses of a DPU program.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    functions: HashMap<String, u64>,
    objects: HashMap<String, u64>,
}

impl SymbolTable {
    pub fn load(path: &Path) -> Result<Self, DpuError> {
        let data = std::fs::read(path)
            .map_err(|err| DpuError::TargetCreation(format!("{}: {}", path.display(), err)))?;
        Self::parse(&data)
            .map_err(|err| DpuError::TargetCreation(format!("{}: {}", path.display(), err)))
    }

    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        let elf = ElfFile::new(data)?;
        let mut table = Self::default();

        for section in elf.section_iter() {
            match section.get_data(&elf) {
                Ok(SectionData::SymbolTable32(entries)) => {
                    for entry in entries {
                        table.insert(&elf, entry)?;
                    }
                }
                Ok(SectionData::SymbolTable64(entries)) => {
                    for entry in entries {
                        table.insert(&elf, entry)?;
                    }
                }
                _ => {}
            }
        }
        Ok(table)
    }

    fn insert<'a, E: Entry>(&mut self, elf: &ElfFile<'a>, entry: &'a E) -> Result<(), &'static str> {
        let map = match entry.get_type()? {
            Type::Func => &mut self.functions,
            Type::Object => &mut self.objects,
            _ => return Ok(()),
        };
        let name = entry.get_name(elf)?;
        if !name.is_empty() {
            map.insert(name.to_string(), entry.value());
        }
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<u64> {
        self.functions.get(name).copied()
    }

    pub fn object(&self, name: &str) -> Option<u64> {
        self.objects.get(name).copied()
    }
}

/// Addresses the stub needs to surface the program's `printf` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintCaptureBinding {
    pub open_sequence: u64,
    pub close_sequence: u64,
    pub buffer: u64,
    pub buffer_size: u64,
    pub buffer_state: u64,
}

pub struct DpuTarget<C: Connection> {
    program: PathBuf,
    triple: String,
    symbols: SymbolTable,
    client: Option<RemoteClient<C>>,
    print_capture: Option<PrintCaptureBinding>,
}

impl<C: Connection> DpuTarget<C> {
    /// Loads the program's symbols. Fails if the binary cannot be read.
    pub fn create(program: &Path, triple: &str) -> Result<Self, DpuError> {
        let symbols = SymbolTable::load(program)?;
        Ok(Self {
            program: program.to_path_buf(),
            triple: triple.to_string(),
            symbols,
            client: None,
            print_capture: None,
        })
    }

    pub fn connect(&mut self, connection: C) -> Result<StopReply, DpuError> {
        let (client, stop) = RemoteClient::connect(connection)
            .map_err(|err| DpuError::Connect(format!("{:?}", err)))?;
        log::debug!(
            "connected to stub for {} ({:?}), no-ack mode: {}",
            self.program.display(),
            stop,
            client.is_no_ack_mode()
        );
        self.client = Some(client);
        Ok(stop)
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn client(&mut self) -> Result<&mut RemoteClient<C>, DpuError> {
        self.client
            .as_mut()
            .ok_or_else(|| DpuError::Remote("target is not connected".into()))
    }

    pub fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, DpuError> {
        self.client()?
            .read_memory(addr, len)
            .map_err(DpuError::remote)
    }

    pub fn write_memory(&mut self, addr: u64, data: &[u8]) -> Result<(), DpuError> {
        self.client()?
            .write_memory(addr, data)
            .map_err(DpuError::remote)
    }

    /// Registers the print buffer with the stub if the program exports it.
    /// Nothing here is fatal: a missing symbol or a refusing stub only
    /// leaves print capture disabled.
    pub fn bind_print_capture(&mut self) -> Option<PrintCaptureBinding> {
        let symbols = &self.symbols;
        let resolved = (|| {
            Some((
                symbols.function("__open_print_sequence")?,
                symbols.function("__close_print_sequence")?,
                symbols.object("__stdout_buffer")?,
                symbols.object("__stdout_buffer_size")?,
                symbols.object("__stdout_buffer_state")?,
            ))
        })();
        let Some((open_sequence, close_sequence, buffer, size_var, buffer_state)) = resolved
        else {
            log::debug!("{} does not print, capture disabled", self.program.display());
            return None;
        };

        let buffer_size = match self.read_memory(size_var, 4) {
            Ok(bytes) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
            Err(err) => {
                log::warn!("could not read print buffer size: {}", err);
                return None;
            }
        };
        let binding = PrintCaptureBinding {
            open_sequence,
            close_sequence,
            buffer,
            buffer_size,
            buffer_state,
        };

        let registered = self.client().and_then(|client| {
            client
                .set_dpu_print_info(
                    open_sequence,
                    close_sequence,
                    buffer,
                    buffer_size,
                    buffer_state,
                )
                .map_err(DpuError::remote)
        });
        match registered {
            Ok(()) => {
                self.print_capture = Some(binding);
                Some(binding)
            }
            Err(err) => {
                log::warn!("print capture disabled: {}", err);
                None
            }
        }
    }

    pub fn print_capture(&self) -> Option<PrintCaptureBinding> {
        self.print_capture
    }

    /// Leaves the DPU running and drops the target.
    pub fn detach(mut self) -> Result<(), DpuError> {
        match self.client.take() {
            Some(client) => {
                log::debug!(
                    "detaching from {} after {} packets",
                    self.program.display(),
                    client.packets_sent()
                );
                client.detach().map_err(DpuError::remote)
            }
            None => Ok(()),
        }
    }

    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}
