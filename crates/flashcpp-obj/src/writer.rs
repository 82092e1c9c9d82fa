//! Object file assembly (§4.8): turns encoded function bytes, relocations
//! and global data into a well-formed ELF or PE/COFF object via the
//! `object` crate. Sections, symbol visibility, and relocation kinds
//! follow the target; bytes already selected by `encode.rs` are copied in
//! verbatim, never re-ordered or re-encoded.

use std::collections::HashMap;

use flashcpp_codegen::{GlobalData, GlobalSymbol};
use flashcpp_ir::Target;
use flashcpp_util::StringInterner;
use object::write::{Object, Relocation, StandardSegment, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, RelocationEncoding, RelocationKind, SectionKind,
    SymbolFlags, SymbolKind, SymbolScope,
};

use crate::encode::{EncodedFunction, RelocKind};
use crate::error::{ObjectError, Result};

pub fn write_object(
    target: Target,
    functions: &[EncodedFunction],
    globals: &[GlobalSymbol],
    interner: &StringInterner,
) -> Result<Vec<u8>> {
    let format = match target {
        Target::Linux => BinaryFormat::Elf,
        Target::Windows => BinaryFormat::Coff,
    };
    let mut obj = Object::new(format, Architecture::X86_64, Endianness::Little);

    let text = obj.add_section(obj.segment_name(StandardSegment::Text).to_vec(), b".text".to_vec(), SectionKind::Text);
    let data = obj.add_section(obj.segment_name(StandardSegment::Data).to_vec(), b".data".to_vec(), SectionKind::Data);
    let bss = obj.add_section(obj.segment_name(StandardSegment::Data).to_vec(), b".bss".to_vec(), SectionKind::UninitializedData);

    let mut offsets = HashMap::new();
    for f in functions {
        if !f.is_external {
            let offset = obj.append_section_data(text, &f.code, 16);
            offsets.insert(f.name, offset);
        }
    }

    let mut symbols = HashMap::new();
    for f in functions {
        let name = interner.resolve(f.name).to_owned();
        let value = offsets.get(&f.name).copied().unwrap_or(0);
        let size = if f.is_external { 0 } else { f.code.len() as u64 };
        let (scope, section) = if f.is_external {
            (SymbolScope::Dynamic, SymbolSection::Undefined)
        } else {
            (SymbolScope::Linkage, SymbolSection::Section(text))
        };
        let id = obj.add_symbol(Symbol {
            name: name.into_bytes(),
            value,
            size,
            kind: SymbolKind::Text,
            scope,
            weak: false,
            section,
            flags: SymbolFlags::None,
        });
        symbols.insert(f.name, id);
    }

    for g in globals {
        let name = interner.resolve(g.name).to_owned();
        let id = match &g.data {
            GlobalData::Zero => {
                let offset = obj.append_section_bss(bss, g.size.max(1), 8);
                obj.add_symbol(Symbol {
                    name: name.into_bytes(),
                    value: offset,
                    size: g.size,
                    kind: SymbolKind::Data,
                    scope: SymbolScope::Linkage,
                    weak: false,
                    section: SymbolSection::Section(bss),
                    flags: SymbolFlags::None,
                })
            }
            GlobalData::Bytes(bytes) => {
                let offset = obj.append_section_data(data, bytes, 8);
                obj.add_symbol(Symbol {
                    name: name.into_bytes(),
                    value: offset,
                    size: bytes.len() as u64,
                    kind: SymbolKind::Data,
                    scope: SymbolScope::Linkage,
                    weak: false,
                    section: SymbolSection::Section(data),
                    flags: SymbolFlags::None,
                })
            }
        };
        symbols.insert(g.name, id);
    }

    for f in functions {
        if f.is_external {
            continue;
        }
        let base = offsets[&f.name];
        for reloc in &f.relocations {
            let symbol = match symbols.get(&reloc.symbol) {
                Some(id) => *id,
                None => {
                    let id = obj.add_symbol(Symbol {
                        name: interner.resolve(reloc.symbol).as_bytes().to_vec(),
                        value: 0,
                        size: 0,
                        kind: SymbolKind::Text,
                        scope: SymbolScope::Dynamic,
                        weak: false,
                        section: SymbolSection::Undefined,
                        flags: SymbolFlags::None,
                    });
                    symbols.insert(reloc.symbol, id);
                    id
                }
            };
            let (kind, encoding) = match reloc.kind {
                RelocKind::Branch32 => (RelocationKind::Relative, RelocationEncoding::X86Branch),
                RelocKind::RipRelative32 => (RelocationKind::Relative, RelocationEncoding::X86RipRelative),
            };
            obj.add_relocation(
                text,
                Relocation { offset: base + reloc.offset, size: 32, kind, encoding, symbol, addend: reloc.addend },
            )
            .map_err(ObjectError::ObjectWrite)?;
        }
    }

    obj.write().map_err(|e| ObjectError::Emit(e.to_string()))
}
