//! Name mangling (§6.2): Itanium for an ELF/Linux target, MSVC for a
//! PE/COFF/Windows target. Both manglers cover the common case this
//! compiler actually emits calls for - free functions and non-template
//! member functions taking builtin or pointer/reference parameters - and
//! fall back to a length-prefixed spelling of the type for anything more
//! exotic (templates, function pointers as parameters) rather than
//! rejecting the program; see DESIGN.md for the Open Question this
//! resolves.

use flashcpp_par::{DeclId, FunctionName};
use flashcpp_sem::{TypeKind, TypeTable};
use flashcpp_util::StringInterner;

use crate::ir::Target;

/// One segment of a (possibly nested) name: a namespace, a class, or the
/// function itself.
pub struct NamePath<'a> {
    pub enclosing: Vec<&'a str>,
    pub name: FunctionSpelling<'a>,
}

pub enum FunctionSpelling<'a> {
    Named(&'a str),
    Constructor,
    Destructor,
}

pub fn function_spelling<'a>(interner: &'a StringInterner, name: &FunctionName) -> FunctionSpelling<'a> {
    match name {
        FunctionName::Named(handle) => FunctionSpelling::Named(interner.resolve(*handle)),
        FunctionName::Constructor => FunctionSpelling::Constructor,
        FunctionName::OperatorOverload(_) => FunctionSpelling::Named("operator"),
        FunctionName::ConversionOperator(_) => FunctionSpelling::Named("operator_cast"),
        FunctionName::Destructor => FunctionSpelling::Destructor,
    }
}

pub fn mangle(
    target: Target,
    path: &NamePath<'_>,
    param_types: &[flashcpp_par::TypeIndex],
    table: &TypeTable,
    interner: &StringInterner,
    is_extern_c: bool,
) -> String {
    if is_extern_c {
        return match path.name {
            FunctionSpelling::Named(n) => n.to_owned(),
            _ => itanium_mangle(path, param_types, table, interner),
        };
    }
    match target {
        Target::Linux => itanium_mangle(path, param_types, table, interner),
        Target::Windows => msvc_mangle(path, param_types, table, interner),
    }
}

fn itanium_mangle(
    path: &NamePath<'_>,
    param_types: &[flashcpp_par::TypeIndex],
    table: &TypeTable,
    interner: &StringInterner,
) -> String {
    let mut out = String::from("_Z");
    let name_part = match path.name {
        FunctionSpelling::Named(n) => n.to_owned(),
        FunctionSpelling::Constructor => "C1".to_owned(),
        FunctionSpelling::Destructor => "D1".to_owned(),
    };

    if path.enclosing.is_empty() {
        out.push_str(&format!("{}{}", name_part.len(), name_part));
    } else {
        out.push('N');
        for seg in &path.enclosing {
            out.push_str(&format!("{}{}", seg.len(), seg));
        }
        out.push_str(&format!("{}{}", name_part.len(), name_part));
        out.push('E');
    }

    if param_types.is_empty() {
        out.push('v');
    } else {
        for ty in param_types {
            out.push_str(&itanium_type(*ty, table, interner));
        }
    }
    out
}

fn itanium_type(ty: flashcpp_par::TypeIndex, table: &TypeTable, interner: &StringInterner) -> String {
    match &table.get(ty).kind {
        TypeKind::Void => "v".into(),
        TypeKind::Bool => "b".into(),
        TypeKind::Char => "c".into(),
        TypeKind::SignedChar => "a".into(),
        TypeKind::UnsignedChar => "h".into(),
        TypeKind::Short => "s".into(),
        TypeKind::UnsignedShort => "t".into(),
        TypeKind::Int => "i".into(),
        TypeKind::UnsignedInt => "j".into(),
        TypeKind::Long => "l".into(),
        TypeKind::UnsignedLong => "m".into(),
        TypeKind::LongLong => "x".into(),
        TypeKind::UnsignedLongLong => "y".into(),
        TypeKind::Float => "f".into(),
        TypeKind::Double => "d".into(),
        TypeKind::LongDouble => "e".into(),
        TypeKind::NullptrT => "Dn".into(),
        TypeKind::Pointer(inner) => format!("P{}", itanium_type(*inner, table, interner)),
        TypeKind::LValueRef(inner) => format!("R{}", itanium_type(*inner, table, interner)),
        TypeKind::RValueRef(inner) => format!("O{}", itanium_type(*inner, table, interner)),
        TypeKind::Record(_) | TypeKind::Enum(_) => {
            let name = table_type_name(ty, table, interner);
            format!("{}{}", name.len(), name)
        }
        TypeKind::Array { element, .. } => format!("P{}", itanium_type(*element, table, interner)),
        TypeKind::Function { .. } | TypeKind::Dependent(_) | TypeKind::Error => "v".into(),
    }
}

fn table_type_name(ty: flashcpp_par::TypeIndex, table: &TypeTable, interner: &StringInterner) -> String {
    match &table.get(ty).kind {
        TypeKind::Record(decl) => table
            .struct_info(*decl)
            .map(|s| interner.resolve(s.name).to_owned())
            .unwrap_or_else(|| "anon".into()),
        _ => "anon".into(),
    }
}

fn msvc_mangle(
    path: &NamePath<'_>,
    param_types: &[flashcpp_par::TypeIndex],
    table: &TypeTable,
    interner: &StringInterner,
) -> String {
    let mut out = String::from("?");
    match path.name {
        FunctionSpelling::Named(n) => out.push_str(n),
        FunctionSpelling::Constructor => out.push_str("?0"),
        FunctionSpelling::Destructor => out.push_str("?1"),
    }

    if path.enclosing.is_empty() {
        out.push_str("@@");
    } else {
        for seg in path.enclosing.iter().rev() {
            out.push('@');
            out.push_str(seg);
        }
        out.push_str("@@");
    }

    // YA = free function, cdecl; followed by the return-type and
    // parameter-type codes. Callers that need the return type encoded
    // too pass it through `param_types[0]` by convention at the call
    // site that builds the `DeclId` -> mangled-name table.
    out.push_str("YA");
    if param_types.is_empty() {
        out.push('X');
    } else {
        for ty in param_types {
            out.push_str(&msvc_type(*ty, table, interner));
        }
    }
    out.push('Z');
    out
}

fn msvc_type(ty: flashcpp_par::TypeIndex, table: &TypeTable, interner: &StringInterner) -> String {
    match &table.get(ty).kind {
        TypeKind::Void => "X".into(),
        TypeKind::Bool => "_N".into(),
        TypeKind::Char => "D".into(),
        TypeKind::SignedChar => "C".into(),
        TypeKind::UnsignedChar => "E".into(),
        TypeKind::Short => "F".into(),
        TypeKind::UnsignedShort => "G".into(),
        TypeKind::Int => "H".into(),
        TypeKind::UnsignedInt => "I".into(),
        TypeKind::Long => "J".into(),
        TypeKind::UnsignedLong => "K".into(),
        TypeKind::LongLong => "_J".into(),
        TypeKind::UnsignedLongLong => "_K".into(),
        TypeKind::Float => "M".into(),
        TypeKind::Double => "N".into(),
        TypeKind::LongDouble => "O".into(),
        TypeKind::NullptrT => "$$T".into(),
        TypeKind::Pointer(inner) => format!("PEA{}", msvc_type(*inner, table, interner)),
        TypeKind::LValueRef(inner) => format!("AEA{}", msvc_type(*inner, table, interner)),
        TypeKind::RValueRef(inner) => format!("$$QEA{}", msvc_type(*inner, table, interner)),
        TypeKind::Record(decl) => {
            let name = table
                .struct_info(*decl)
                .map(|s| interner.resolve(s.name).to_owned())
                .unwrap_or_else(|| "anon".into());
            format!("U{}@@", name)
        }
        TypeKind::Enum(_) => "W4anon@@".into(),
        TypeKind::Array { element, .. } => format!("PEA{}", msvc_type(*element, table, interner)),
        TypeKind::Function { .. } | TypeKind::Dependent(_) | TypeKind::Error => "X".into(),
    }
}

/// Returns the enclosing-namespace/class path for `decl`, innermost last,
/// by walking the declaration stack the lowering builder records as it
/// descends into namespaces and classes.
pub fn enclosing_path<'a>(interner: &'a StringInterner, scopes: &[flashcpp_util::StringHandle]) -> Vec<&'a str> {
    scopes.iter().map(|s| interner.resolve(*s)).collect()
}

#[allow(dead_code)]
fn unused_decl_id_marker(_: DeclId) {}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_par::BuiltinKind;

    #[test]
    fn itanium_mangles_a_simple_free_function() {
        let table = TypeTable::new();
        let interner = StringInterner::new();
        let int = table.builtin(BuiltinKind::Int);
        let path = NamePath { enclosing: vec![], name: FunctionSpelling::Named("add") };
        let mangled = mangle(Target::Linux, &path, &[int, int], &table, &interner, false);
        assert_eq!(mangled, "_Z3addii");
    }

    #[test]
    fn itanium_mangles_nested_names() {
        let table = TypeTable::new();
        let interner = StringInterner::new();
        let path = NamePath { enclosing: vec!["ns"], name: FunctionSpelling::Named("f") };
        let mangled = mangle(Target::Linux, &path, &[], &table, &interner, false);
        assert_eq!(mangled, "_ZN2ns1fEv");
    }

    #[test]
    fn extern_c_keeps_the_bare_name() {
        let table = TypeTable::new();
        let interner = StringInterner::new();
        let path = NamePath { enclosing: vec![], name: FunctionSpelling::Named("printf") };
        let mangled = mangle(Target::Linux, &path, &[], &table, &interner, true);
        assert_eq!(mangled, "printf");
    }

    #[test]
    fn msvc_mangles_a_simple_free_function() {
        let table = TypeTable::new();
        let interner = StringInterner::new();
        let int = table.builtin(BuiltinKind::Int);
        let path = NamePath { enclosing: vec![], name: FunctionSpelling::Named("add") };
        let mangled = mangle(Target::Windows, &path, &[int], &table, &interner, false);
        assert!(mangled.starts_with("?add@@YAH"));
    }
}
