//! Guest Code Images
//!
//! A contiguous run of guest code bytes mapped at a base address, loaded
//! either from a raw file or from an executable section of an ELF file.

use anyhow::{anyhow, bail, Context, Result};
use goblin::elf::header::{EM_PPC, EM_PPC64};
use goblin::elf::section_header::SHF_EXECINSTR;
use goblin::elf::Elf;
use ppcir_core::{Endness, GuestArch};

/// Code bytes mapped at `base`.
#[derive(Debug, Clone)]
pub struct Image {
    pub base: u64,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn raw(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.bytes.len() as u64
    }

    /// Byte offset of `addr`, if a whole instruction word is mapped there.
    pub fn offset_of(&self, addr: u64) -> Option<usize> {
        let off = addr.checked_sub(self.base)?;
        if off.checked_add(4)? <= self.bytes.len() as u64 {
            Some(off as usize)
        } else {
            None
        }
    }
}

/// What an ELF file says about its guest.
#[derive(Debug, Clone, Copy)]
pub struct ElfTarget {
    pub arch: GuestArch,
    pub endness: Endness,
}

/// How to pick the start address inside an ELF file.
pub enum ElfStart<'a> {
    Entry,
    Symbol(&'a str),
    Addr(u64),
}

/// The executable section holding `start`, plus the resolved start address.
pub fn load_elf(data: &[u8], start: ElfStart<'_>) -> Result<(Image, ElfTarget, u64)> {
    let elf = Elf::parse(data).context("Failed to parse ELF file")?;
    let arch = match elf.header.e_machine {
        EM_PPC => GuestArch::Ppc32,
        EM_PPC64 => GuestArch::Ppc64,
        other => bail!("not a PowerPC ELF file (e_machine = {})", other),
    };
    let endness = if elf.little_endian { Endness::Little } else { Endness::Big };
    let target = ElfTarget { arch, endness };

    let mut addr: u64 = match start {
        ElfStart::Entry => elf.entry,
        ElfStart::Addr(a) => a,
        ElfStart::Symbol(name) => elf
            .syms
            .iter()
            .find(|s| elf.strtab.get_at(s.st_name) == Some(name))
            .map(|s| s.st_value)
            .ok_or_else(|| anyhow!("symbol not found: {}", name))?,
    };

    // ELFv1 function symbols name a descriptor in .opd; its first
    // doubleword is the code address.
    if let Some(opd) = section_named(&elf, ".opd") {
        if addr >= opd.sh_addr && addr < opd.sh_addr + opd.sh_size {
            let off = (opd.sh_offset + (addr - opd.sh_addr)) as usize;
            let raw: [u8; 8] = data
                .get(off..off + 8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| anyhow!("truncated .opd entry at 0x{:x}", addr))?;
            addr = match endness {
                Endness::Big => u64::from_be_bytes(raw),
                Endness::Little => u64::from_le_bytes(raw),
            };
            log::debug!("resolved function descriptor to 0x{:x}", addr);
        }
    }

    let sh = elf
        .section_headers
        .iter()
        .filter(|sh| sh.sh_flags & SHF_EXECINSTR as u64 != 0)
        .find(|sh| addr >= sh.sh_addr && addr < sh.sh_addr + sh.sh_size)
        .ok_or_else(|| anyhow!("0x{:x} is not inside an executable section", addr))?;
    let range = sh.file_range().ok_or_else(|| anyhow!("executable section has no file data"))?;
    let bytes = data
        .get(range)
        .ok_or_else(|| anyhow!("executable section extends past the end of the file"))?
        .to_vec();
    let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("?");
    log::info!("decoding from {} at 0x{:x} ({} bytes)", name, sh.sh_addr, bytes.len());

    Ok((Image { base: sh.sh_addr, bytes }, target, addr))
}

fn section_named<'a>(elf: &'a Elf<'_>, name: &str) -> Option<&'a goblin::elf::SectionHeader> {
    elf.section_headers.iter().find(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_need_a_whole_word() {
        let img = Image::raw(0x1000, vec![0; 10]);
        assert_eq!(img.offset_of(0x1000), Some(0));
        assert_eq!(img.offset_of(0x1006), Some(6));
        assert_eq!(img.offset_of(0x1007), None);
        assert_eq!(img.offset_of(0xFFC), None);
        assert!(img.contains(0x1009));
        assert!(!img.contains(0x100A));
    }

    #[test]
    fn test_rejects_non_elf() {
        assert!(load_elf(b"not an elf", ElfStart::Entry).is_err());
    }
}
