// CLI command handlers
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ppcir_core::frontend::guest_state::GuestSlot;
use ppcir_core::frontend::ir::{get, mk_u32, mk_u64, IrType, Stmt};
use ppcir_core::{
    family_of, translate_instruction, ArchInfo, DecodeInputs, DecodeResult, Endness, GuestArch, GuestLayout,
    InsnWord, IrBlock, JumpKind, PpcGuestLayout, WhatNext,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::GuestConfig;
use crate::image::{load_elf, ElfStart, ElfTarget, Image};

/// Command-line overrides applied on top of the configuration file.
#[derive(Debug, Default, Clone)]
pub struct TargetOverrides {
    pub config: Option<PathBuf>,
    pub arch: Option<GuestArch>,
    pub endness: Option<Endness>,
    pub sigill_diag: bool,
}

/// Limits on how much code `translate` and `elf` decode.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_blocks: usize,
    pub max_insns: u32,
}

/// File configuration, then the ELF header, then explicit flags.
fn resolve_config(over: &TargetOverrides, elf: Option<ElfTarget>) -> Result<GuestConfig> {
    let mut cfg = match &over.config {
        Some(path) => GuestConfig::load(path)?,
        None => GuestConfig::default(),
    };
    if let Some(t) = elf {
        cfg.arch = t.arch;
        cfg.endness = t.endness;
    }
    if let Some(arch) = over.arch {
        cfg.arch = arch;
    }
    if let Some(end) = over.endness {
        cfg.endness = end;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Decoder state shared by every block of one command.
struct Decoder {
    cfg: GuestConfig,
    arch_info: ArchInfo,
    layout: PpcGuestLayout,
    sigill_diag: bool,
}

/// One decoded block and the number of guest instructions in it.
struct DecodedBlock {
    block: IrBlock,
    insns: u32,
}

impl Decoder {
    fn new(cfg: GuestConfig, sigill_diag: bool) -> Self {
        let arch_info = cfg.arch_info();
        let layout = PpcGuestLayout::new(cfg.arch);
        Self { cfg, arch_info, layout, sigill_diag }
    }

    fn word_ty(&self) -> IrType {
        if self.cfg.arch.is_64() {
            IrType::I64
        } else {
            IrType::I32
        }
    }

    fn end_at_const(&self, block: &mut IrBlock, addr: u64) {
        block.next = Some(if self.cfg.arch.is_64() { mk_u64(addr) } else { mk_u32(addr as u32) });
        block.jumpkind = JumpKind::Boring;
    }

    /// Decode one instruction at `addr` into `block`.
    fn step(
        &self,
        block: &mut IrBlock,
        image: &Image,
        addr: u64,
        start: u64,
        resteer_ok: &dyn Fn(u64) -> bool,
    ) -> Option<DecodeResult> {
        let delta = image.offset_of(addr)?;
        let inputs = DecodeInputs {
            code: &image.bytes,
            delta,
            cia: addr,
            block_start: start,
            arch: self.cfg.arch,
            arch_info: &self.arch_info,
            abi: &self.cfg.abi,
            host_end: host_endness(),
            resteer_ok,
            injector: None,
            sigill_diag: self.sigill_diag,
            layout: &self.layout,
        };
        Some(translate_instruction(block, &inputs))
    }

    /// Decode a basic block starting at `start`, following resteers while
    /// they stay inside the image.
    fn decode_block(&self, image: &Image, start: u64, max_insns: u32) -> DecodedBlock {
        let mut block = IrBlock::new(self.layout.offset_of(GuestSlot::Cia));
        let mut addr = start;
        let mut insns: u32 = 0;

        loop {
            if insns >= max_insns {
                self.end_at_const(&mut block, addr);
                break;
            }
            let budget_left: bool = insns + 1 < max_insns;
            let resteer_ok = |target: u64| budget_left && image.offset_of(target).is_some();
            let Some(res) = self.step(&mut block, image, addr, start, &resteer_ok) else {
                log::debug!("0x{:x} is outside the image, ending block", addr);
                self.end_at_const(&mut block, addr);
                break;
            };
            insns += 1;
            match res.what_next {
                WhatNext::Continue => addr += u64::from(res.len),
                WhatNext::Resteer { target } => addr = target,
                WhatNext::StopHere(jk) => {
                    block.next = Some(get(block.offs_ip, self.word_ty()));
                    block.jumpkind = jk;
                    break;
                }
            }
        }
        DecodedBlock { block, insns }
    }
}

fn host_endness() -> Endness {
    if cfg!(target_endian = "big") {
        Endness::Big
    } else {
        Endness::Little
    }
}

/// Constant successors of a block: side exits, then the final target.
fn successors(block: &IrBlock) -> Vec<u64> {
    let mut out: Vec<u64> = Vec::new();
    let mut last_cia: Option<u64> = None;
    for stmt in &block.stmts {
        match stmt {
            Stmt::Exit { dst, .. } => out.extend(dst.as_u64()),
            Stmt::Put { offset, data } if *offset == block.offs_ip => {
                last_cia = data.as_const().and_then(|c| c.as_u64());
            }
            _ => {}
        }
    }
    let follow_end: bool = matches!(
        block.jumpkind,
        JumpKind::Boring | JumpKind::Call | JumpKind::SysSyscall
    );
    if follow_end {
        match block.next.as_ref().and_then(|e| e.as_const()) {
            Some(c) => out.extend(c.as_u64()),
            None => out.extend(last_cia),
        }
    }
    out
}

/// Decode every block reachable from `entry` and print its IR.
fn walk_blocks(decoder: &Decoder, image: &Image, entry: u64, limits: Limits) -> Result<()> {
    if image.offset_of(entry).is_none() {
        let end = image.base + image.bytes.len() as u64;
        bail!("entry 0x{:x} is outside the image [0x{:x}, 0x{:x})", entry, image.base, end);
    }
    if entry % 4 != 0 {
        bail!("entry 0x{:x} is not word aligned", entry);
    }

    let mut queue: VecDeque<u64> = VecDeque::from([entry]);
    let mut seen: BTreeSet<u64> = BTreeSet::new();
    let mut blocks: usize = 0;

    while let Some(addr) = queue.pop_front() {
        if blocks >= limits.max_blocks {
            log::info!("block limit reached, {} targets left unvisited", queue.len() + 1);
            break;
        }
        if !seen.insert(addr) || image.offset_of(addr).is_none() {
            continue;
        }
        let decoded = decoder.decode_block(image, addr, limits.max_insns);
        blocks += 1;

        println!("==== 0x{:08x}: {} instruction(s), {:?} ====", addr, decoded.insns, decoded.block.jumpkind);
        println!("{}", decoded.block);

        for next in successors(&decoded.block) {
            if !seen.contains(&next) {
                queue.push_back(next);
            }
        }
    }

    println!("Decoded {} block(s)", blocks);
    Ok(())
}

pub fn translate_raw(file: &Path, base: u64, entry: Option<u64>, over: &TargetOverrides, limits: Limits) -> Result<()> {
    println!("Reading image: {}", file.display());
    let bytes = fs::read(file).with_context(|| format!("Failed to read image: {}", file.display()))?;
    let cfg = resolve_config(over, None)?;
    log::info!("guest {:?} {:?}-endian, {} bytes at 0x{:x}", cfg.arch, cfg.endness, bytes.len(), base);

    let image = Image::raw(base, bytes);
    let decoder = Decoder::new(cfg, over.sigill_diag);
    walk_blocks(&decoder, &image, entry.unwrap_or(base), limits)
}

pub fn translate_elf(file: &Path, start: ElfStart<'_>, over: &TargetOverrides, limits: Limits) -> Result<()> {
    println!("Reading ELF file: {}", file.display());
    let data = fs::read(file).with_context(|| format!("Failed to read ELF file: {}", file.display()))?;
    let (image, target, entry) = load_elf(&data, start)?;
    let cfg = resolve_config(over, Some(target))?;

    println!("  Machine: {:?} ({:?}-endian)", target.arch, target.endness);
    println!("  Entry: 0x{:08x}", entry);

    let decoder = Decoder::new(cfg, over.sigill_diag);
    walk_blocks(&decoder, &image, entry, limits)
}

/// Per-family decode statistics.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FamilyStats {
    pub words: u64,
    pub no_decode: u64,
}

/// Result of decoding every aligned word of an image.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanReport {
    pub words: u64,
    pub decoded: u64,
    pub no_decode: u64,
    /// Words no family claims.
    pub unassigned: u64,
    pub families: BTreeMap<String, FamilyStats>,
}

fn scan_image(decoder: &Decoder, image: &Image, pb: &ProgressBar) -> ScanReport {
    let mut report = ScanReport::default();
    let big_endian: bool = decoder.cfg.endness == Endness::Big;
    let never = |_: u64| false;

    let mut addr = image.base;
    while let Some(off) = image.offset_of(addr) {
        let Some(word) = InsnWord::fetch(&image.bytes, off, big_endian) else { break };
        let mut block = IrBlock::new(decoder.layout.offset_of(GuestSlot::Cia));
        let failed: bool = decoder
            .step(&mut block, image, addr, addr, &never)
            .map_or(true, |r| r.is_no_decode());

        report.words += 1;
        if failed {
            report.no_decode += 1;
        } else {
            report.decoded += 1;
        }
        match family_of(word) {
            Some(name) => {
                let stats = report.families.entry(name.to_string()).or_default();
                stats.words += 1;
                stats.no_decode += failed as u64;
            }
            None => report.unassigned += 1,
        }

        addr += 4;
        pb.inc(1);
    }
    report
}

pub fn scan(file: &Path, base: u64, over: &TargetOverrides, json: bool) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read image: {}", file.display()))?;
    let cfg = resolve_config(over, None)?;
    let image = Image::raw(base, bytes);
    let decoder = Decoder::new(cfg, over.sigill_diag);

    let pb = ProgressBar::new(image.bytes.len() as u64 / 4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.green} {pos}/{len} words {msg}")
            .context("Invalid progress template")?,
    );
    let report = scan_image(&decoder, &image, &pb);
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize scan report")?);
        return Ok(());
    }

    println!("Scanned {} word(s) of {}", report.words, file.display());
    println!("  Decoded: {}", report.decoded);
    println!("  No decode: {}", report.no_decode);
    println!("  Unassigned: {}", report.unassigned);
    for (name, stats) in &report.families {
        println!("    {:<12} {:>8} words, {:>8} rejected", name, stats.words, stats.no_decode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be_image(words: &[u32]) -> Image {
        Image::raw(0x1000, words.iter().flat_map(|w| w.to_be_bytes()).collect())
    }

    fn ppc64() -> Decoder {
        Decoder::new(GuestConfig::default(), false)
    }

    #[test]
    fn test_block_ends_at_blr() {
        // li r3,5 ; addi r3,r3,1 ; blr
        let image = be_image(&[0x38600005, 0x38630001, 0x4E800020]);
        let d = ppc64().decode_block(&image, 0x1000, 64);
        assert_eq!(d.insns, 3);
        assert_eq!(d.block.jumpkind, JumpKind::Ret);
        assert!(successors(&d.block).is_empty());
    }

    #[test]
    fn test_block_stops_at_insn_limit() {
        let image = be_image(&[0x60000000; 8]);
        let d = ppc64().decode_block(&image, 0x1000, 3);
        assert_eq!(d.insns, 3);
        assert_eq!(successors(&d.block), vec![0x100C]);
    }

    #[test]
    fn test_block_stops_at_image_end() {
        let image = be_image(&[0x60000000, 0x60000000]);
        let d = ppc64().decode_block(&image, 0x1000, 64);
        assert_eq!(d.insns, 2);
        assert_eq!(d.block.jumpkind, JumpKind::Boring);
        assert_eq!(successors(&d.block), vec![0x1008]);
    }

    #[test]
    fn test_conditional_branch_has_two_successors() {
        // beq +0x10 ; nop
        let image = be_image(&[0x41820010, 0x60000000]);
        let d = ppc64().decode_block(&image, 0x1000, 64);
        let mut succ = successors(&d.block);
        succ.sort();
        assert_eq!(succ, vec![0x1004, 0x1010]);
    }

    #[test]
    fn test_scan_counts_rejected_words() {
        // li r3,5 ; ldu r5,8(r5) ; all-zero word
        let image = be_image(&[0x38600005, 0xE8A50009, 0x00000000]);
        let report = scan_image(&ppc64(), &image, &ProgressBar::hidden());
        assert_eq!(report.words, 3);
        assert_eq!(report.no_decode, 2);
        assert_eq!(report.decoded, 1);
    }

    #[test]
    fn test_flags_override_config() {
        let over = TargetOverrides { arch: Some(GuestArch::Ppc32), ..TargetOverrides::default() };
        let cfg = resolve_config(&over, Some(ElfTarget { arch: GuestArch::Ppc64, endness: Endness::Big })).unwrap();
        assert_eq!(cfg.arch, GuestArch::Ppc32);

        let over = TargetOverrides { endness: Some(Endness::Little), ..over };
        assert!(resolve_config(&over, None).is_err());
    }
}
