//! The semantic type table (§3.2 TypeInfo / StructInfo) and its builder.
//!
//! `flashcpp-par` resolves a syntactic type specifier to a [`TypeIndex`]
//! handle as early as it can; this module owns what that handle actually
//! points at. The table only grows - once a [`TypeIndex`] is assigned it
//! never moves and never changes kind, though a record's [`StructInfo`] is
//! mutated while its members are being collected and then frozen (§3.3).

use flashcpp_par::{AccessSpec, BuiltinKind, CvQualifiers, DeclId, TypeIndex};
use flashcpp_util::{FxHashMap, IndexVec, StringHandle};

/// The structural shape of a type, independent of cv-qualification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Char8T,
    Char16T,
    Char32T,
    WCharT,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    NullptrT,
    Pointer(TypeIndex),
    LValueRef(TypeIndex),
    RValueRef(TypeIndex),
    Array { element: TypeIndex, size: Option<u64> },
    Function { params: Vec<TypeIndex>, ret: TypeIndex, is_variadic: bool },
    /// A class/struct/union; the layout lives in `TypeTable::structs`, keyed
    /// by the same `DeclId` that declared it.
    Record(DeclId),
    Enum(DeclId),
    /// A name that stays unresolved until an enclosing template is
    /// instantiated (mirrors `TypeSpecKind::Dependent`).
    Dependent(StringHandle),
    /// Recovery placeholder for a type specifier that failed to resolve.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub cv: CvQualifiers,
}

#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub ty: TypeIndex,
    pub offset: u64,
    pub access: AccessSpec,
    pub is_static: bool,
    pub bit_width: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct BaseInfo {
    pub ty: TypeIndex,
    pub access: AccessSpec,
    pub is_virtual: bool,
    pub offset: u64,
}

/// Class/struct/union layout (§3.2). Mutable while the class body is being
/// walked, frozen once every member has been added (§3.3: "adding further
/// members is a hard error" after that point).
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub name: StringHandle,
    pub flavor: flashcpp_par::RecordKind,
    pub bases: Vec<BaseInfo>,
    /// Ordered by declaration so mangling and codegen see a stable layout;
    /// `indexmap` keeps insertion order without giving up hashed lookup.
    pub members: indexmap::IndexMap<StringHandle, MemberInfo>,
    pub size: u64,
    pub align: u64,
    pub has_user_destructor: bool,
    pub is_polymorphic: bool,
    frozen: bool,
}

impl StructInfo {
    fn new(name: StringHandle, flavor: flashcpp_par::RecordKind) -> Self {
        Self {
            name,
            flavor,
            bases: Vec::new(),
            members: indexmap::IndexMap::new(),
            size: 0,
            align: 1,
            has_user_destructor: false,
            is_polymorphic: false,
            frozen: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Error produced by mutating a class layout that has already been frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutFrozenError;

/// Primitive types are inserted in this fixed order so their `TypeIndex`
/// values are stable and documented (SPEC_FULL §4). `void` lands at index 0
/// per §3.1 ("TypeIndex(0) is reserved for void").
const PRIMITIVE_ORDER: &[(BuiltinOrVoid, TypeKind)] = &[
    (BuiltinOrVoid::Void, TypeKind::Void),
    (BuiltinOrVoid::Builtin(BuiltinKind::Bool), TypeKind::Bool),
    (BuiltinOrVoid::Builtin(BuiltinKind::Char), TypeKind::Char),
    (BuiltinOrVoid::Builtin(BuiltinKind::SignedChar), TypeKind::SignedChar),
    (BuiltinOrVoid::Builtin(BuiltinKind::UnsignedChar), TypeKind::UnsignedChar),
    (BuiltinOrVoid::Builtin(BuiltinKind::Short), TypeKind::Short),
    (BuiltinOrVoid::Builtin(BuiltinKind::UnsignedShort), TypeKind::UnsignedShort),
    (BuiltinOrVoid::Builtin(BuiltinKind::Int), TypeKind::Int),
    (BuiltinOrVoid::Builtin(BuiltinKind::UnsignedInt), TypeKind::UnsignedInt),
    (BuiltinOrVoid::Builtin(BuiltinKind::Long), TypeKind::Long),
    (BuiltinOrVoid::Builtin(BuiltinKind::UnsignedLong), TypeKind::UnsignedLong),
    (BuiltinOrVoid::Builtin(BuiltinKind::LongLong), TypeKind::LongLong),
    (BuiltinOrVoid::Builtin(BuiltinKind::UnsignedLongLong), TypeKind::UnsignedLongLong),
    (BuiltinOrVoid::Builtin(BuiltinKind::Float), TypeKind::Float),
    (BuiltinOrVoid::Builtin(BuiltinKind::Double), TypeKind::Double),
    (BuiltinOrVoid::Builtin(BuiltinKind::LongDouble), TypeKind::LongDouble),
    (BuiltinOrVoid::Builtin(BuiltinKind::Nullptr), TypeKind::NullptrT),
    // Not named in SPEC_FULL's documented order but part of the closed
    // BuiltinKind set the parser can produce; appended after the documented
    // prefix so the first 17 indices match the spec exactly.
    (BuiltinOrVoid::Builtin(BuiltinKind::Char8T), TypeKind::Char8T),
    (BuiltinOrVoid::Builtin(BuiltinKind::Char16T), TypeKind::Char16T),
    (BuiltinOrVoid::Builtin(BuiltinKind::Char32T), TypeKind::Char32T),
    (BuiltinOrVoid::Builtin(BuiltinKind::WCharT), TypeKind::WCharT),
];

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum BuiltinOrVoid {
    Void,
    Builtin(BuiltinKind),
}

pub struct TypeTable {
    types: IndexVec<TypeIndex, TypeInfo>,
    structs: FxHashMap<DeclId, StructInfo>,
    enums: FxHashMap<DeclId, TypeIndex>,
    by_builtin: FxHashMap<BuiltinOrVoid, TypeIndex>,
    pointer_cache: FxHashMap<(TypeIndex, CvQualifiers), TypeIndex>,
    lvalue_ref_cache: FxHashMap<TypeIndex, TypeIndex>,
    rvalue_ref_cache: FxHashMap<TypeIndex, TypeIndex>,
    /// Maps a declaration back to the `TypeIndex` it resolves to, so a name
    /// lookup that resolves to a `DeclId` can reach its type without a
    /// linear scan of `types`. Populated for records/enums as soon as they
    /// are registered, and for `auto`-typed variables once the analyzer has
    /// deduced their type from the initializer (`resolve_type_spec` alone
    /// can't recover an `auto` spelling).
    decl_type: FxHashMap<DeclId, TypeIndex>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut types = IndexVec::new();
        let mut by_builtin = FxHashMap::default();
        for (key, kind) in PRIMITIVE_ORDER {
            let idx = types.push(TypeInfo { kind: kind.clone(), cv: CvQualifiers::default() });
            by_builtin.insert(*key, idx);
        }
        Self {
            types,
            structs: FxHashMap::default(),
            enums: FxHashMap::default(),
            by_builtin,
            pointer_cache: FxHashMap::default(),
            lvalue_ref_cache: FxHashMap::default(),
            rvalue_ref_cache: FxHashMap::default(),
            decl_type: FxHashMap::default(),
        }
    }

    pub fn type_of_decl(&self, decl: DeclId) -> Option<TypeIndex> {
        self.decl_type.get(&decl).copied()
    }

    /// Records the deduced type of a declaration that can't be recovered
    /// from its syntax alone (chiefly an `auto`-typed variable). Does not
    /// overwrite an existing entry, so calling this on a record/enum that
    /// already registered its own `TypeIndex` is a no-op.
    pub fn set_decl_type(&mut self, decl: DeclId, ty: TypeIndex) {
        self.decl_type.entry(decl).or_insert(ty);
    }

    pub fn void(&self) -> TypeIndex {
        self.by_builtin[&BuiltinOrVoid::Void]
    }

    pub fn builtin(&self, kind: BuiltinKind) -> TypeIndex {
        self.by_builtin[&BuiltinOrVoid::Builtin(kind)]
    }

    pub fn get(&self, idx: TypeIndex) -> &TypeInfo {
        &self.types[idx]
    }

    fn insert(&mut self, kind: TypeKind, cv: CvQualifiers) -> TypeIndex {
        self.types.push(TypeInfo { kind, cv })
    }

    /// Interns a pointer-to-`target` type, reusing a previous one with the
    /// same pointee and cv-qualification rather than growing the table
    /// every time the same `T*` is spelled again.
    pub fn pointer_to(&mut self, target: TypeIndex, cv: CvQualifiers) -> TypeIndex {
        if let Some(&idx) = self.pointer_cache.get(&(target, cv)) {
            return idx;
        }
        let idx = self.insert(TypeKind::Pointer(target), cv);
        self.pointer_cache.insert((target, cv), idx);
        idx
    }

    pub fn lvalue_ref_to(&mut self, target: TypeIndex) -> TypeIndex {
        if let Some(&idx) = self.lvalue_ref_cache.get(&target) {
            return idx;
        }
        let idx = self.insert(TypeKind::LValueRef(target), CvQualifiers::default());
        self.lvalue_ref_cache.insert(target, idx);
        idx
    }

    pub fn rvalue_ref_to(&mut self, target: TypeIndex) -> TypeIndex {
        if let Some(&idx) = self.rvalue_ref_cache.get(&target) {
            return idx;
        }
        let idx = self.insert(TypeKind::RValueRef(target), CvQualifiers::default());
        self.rvalue_ref_cache.insert(target, idx);
        idx
    }

    pub fn array_of(&mut self, element: TypeIndex, size: Option<u64>) -> TypeIndex {
        self.insert(TypeKind::Array { element, size }, CvQualifiers::default())
    }

    pub fn function_of(&mut self, params: Vec<TypeIndex>, ret: TypeIndex, is_variadic: bool) -> TypeIndex {
        self.insert(TypeKind::Function { params, ret, is_variadic }, CvQualifiers::default())
    }

    pub fn dependent(&mut self, name: StringHandle) -> TypeIndex {
        self.insert(TypeKind::Dependent(name), CvQualifiers::default())
    }

    pub fn error_type(&mut self) -> TypeIndex {
        self.insert(TypeKind::Error, CvQualifiers::default())
    }

    /// Registers a new, empty record type so self-referential members
    /// (`struct Node { Node* next; }`) can name it before its body is fully
    /// walked. Call [`TypeTable::freeze_struct`] once every member is added.
    pub fn register_struct(&mut self, decl: DeclId, name: StringHandle, flavor: flashcpp_par::RecordKind) -> TypeIndex {
        if let Some(&existing) = self.decl_type.get(&decl) {
            return existing;
        }
        self.structs.entry(decl).or_insert_with(|| StructInfo::new(name, flavor));
        let idx = self.insert(TypeKind::Record(decl), CvQualifiers::default());
        self.decl_type.insert(decl, idx);
        idx
    }

    pub fn register_enum(&mut self, decl: DeclId, underlying: TypeIndex) -> TypeIndex {
        if let Some(&existing) = self.decl_type.get(&decl) {
            return existing;
        }
        let idx = self.insert(TypeKind::Enum(decl), CvQualifiers::default());
        self.enums.insert(decl, underlying);
        self.decl_type.insert(decl, idx);
        idx
    }

    pub fn enum_underlying(&self, decl: DeclId) -> Option<TypeIndex> {
        self.enums.get(&decl).copied()
    }

    pub fn struct_info(&self, decl: DeclId) -> Option<&StructInfo> {
        self.structs.get(&decl)
    }

    /// Adds a member to a class layout being built, computing its offset
    /// from the current size and the member's alignment.
    pub fn add_member(
        &mut self,
        decl: DeclId,
        name: StringHandle,
        ty: TypeIndex,
        access: AccessSpec,
        is_static: bool,
    ) -> Result<(), LayoutFrozenError> {
        let member_align = self.align_of(ty);
        let member_size = self.size_of(ty);
        let info = self.structs.get_mut(&decl).expect("struct registered before members are added");
        if info.frozen {
            return Err(LayoutFrozenError);
        }
        if is_static {
            info.members.insert(name, MemberInfo { ty, offset: 0, access, is_static: true, bit_width: None });
            return Ok(());
        }
        let offset = align_up(info.size, member_align);
        info.members.insert(name, MemberInfo { ty, offset, access, is_static: false, bit_width: None });
        info.size = offset + member_size;
        info.align = info.align.max(member_align);
        Ok(())
    }

    pub fn add_base(&mut self, decl: DeclId, base: BaseInfo) -> Result<(), LayoutFrozenError> {
        let base_size = self.size_of(base.ty);
        let base_align = self.align_of(base.ty);
        let info = self.structs.get_mut(&decl).expect("struct registered before bases are added");
        if info.frozen {
            return Err(LayoutFrozenError);
        }
        let offset = align_up(info.size, base_align);
        let mut base = base;
        base.offset = offset;
        info.size = offset + base_size;
        info.align = info.align.max(base_align);
        info.bases.push(base);
        Ok(())
    }

    pub fn set_has_user_destructor(&mut self, decl: DeclId) {
        if let Some(info) = self.structs.get_mut(&decl) {
            info.has_user_destructor = true;
        }
    }

    pub fn set_polymorphic(&mut self, decl: DeclId) {
        if let Some(info) = self.structs.get_mut(&decl) {
            info.is_polymorphic = true;
        }
    }

    /// Freezes a class's layout; pads the final size up to its own
    /// alignment, matching the Itanium/MSVC convention that `sizeof(T)` is
    /// always a multiple of `alignof(T)`.
    pub fn freeze_struct(&mut self, decl: DeclId) {
        if let Some(info) = self.structs.get_mut(&decl) {
            if !info.frozen {
                let align = info.align.max(1);
                info.size = align_up(info.size, align).max(1);
                info.frozen = true;
            }
        }
    }

    pub fn size_of(&self, idx: TypeIndex) -> u64 {
        match &self.get(idx).kind {
            TypeKind::Void | TypeKind::Error | TypeKind::Dependent(_) => 0,
            TypeKind::Bool | TypeKind::Char | TypeKind::SignedChar | TypeKind::UnsignedChar | TypeKind::Char8T => 1,
            TypeKind::Char16T | TypeKind::Short | TypeKind::UnsignedShort => 2,
            TypeKind::Char32T
            | TypeKind::WCharT
            | TypeKind::Int
            | TypeKind::UnsignedInt
            | TypeKind::Float => 4,
            TypeKind::Long
            | TypeKind::UnsignedLong
            | TypeKind::LongLong
            | TypeKind::UnsignedLongLong
            | TypeKind::Double
            | TypeKind::Pointer(_)
            | TypeKind::LValueRef(_)
            | TypeKind::RValueRef(_)
            | TypeKind::NullptrT
            | TypeKind::Function { .. } => 8,
            TypeKind::LongDouble => 16,
            TypeKind::Array { element, size } => size.map(|n| n * self.size_of(*element)).unwrap_or(0),
            TypeKind::Record(decl) => self.structs.get(decl).map(|s| s.size).unwrap_or(0),
            TypeKind::Enum(decl) => self.enum_underlying(*decl).map(|u| self.size_of(u)).unwrap_or(4),
        }
    }

    pub fn align_of(&self, idx: TypeIndex) -> u64 {
        match &self.get(idx).kind {
            TypeKind::Record(decl) => self.structs.get(decl).map(|s| s.align).unwrap_or(1),
            TypeKind::Array { element, .. } => self.align_of(*element),
            TypeKind::Enum(decl) => self.enum_underlying(*decl).map(|u| self.align_of(u)).unwrap_or(4),
            _ => self.size_of(idx).max(1),
        }
    }

    pub fn is_arithmetic(&self, idx: TypeIndex) -> bool {
        matches!(
            self.get(idx).kind,
            TypeKind::Bool
                | TypeKind::Char
                | TypeKind::SignedChar
                | TypeKind::UnsignedChar
                | TypeKind::Char8T
                | TypeKind::Char16T
                | TypeKind::Char32T
                | TypeKind::WCharT
                | TypeKind::Short
                | TypeKind::UnsignedShort
                | TypeKind::Int
                | TypeKind::UnsignedInt
                | TypeKind::Long
                | TypeKind::UnsignedLong
                | TypeKind::LongLong
                | TypeKind::UnsignedLongLong
                | TypeKind::Float
                | TypeKind::Double
                | TypeKind::LongDouble
                | TypeKind::Enum(_)
        )
    }

    pub fn is_floating_point(&self, idx: TypeIndex) -> bool {
        matches!(self.get(idx).kind, TypeKind::Float | TypeKind::Double | TypeKind::LongDouble)
    }

    pub fn is_integral(&self, idx: TypeIndex) -> bool {
        self.is_arithmetic(idx) && !self.is_floating_point(idx)
    }

    pub fn is_signed(&self, idx: TypeIndex) -> bool {
        matches!(
            self.get(idx).kind,
            TypeKind::SignedChar
                | TypeKind::Short
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::LongLong
                | TypeKind::Float
                | TypeKind::Double
                | TypeKind::LongDouble
        )
    }

    pub fn is_pointer(&self, idx: TypeIndex) -> bool {
        matches!(self.get(idx).kind, TypeKind::Pointer(_))
    }

    pub fn is_reference(&self, idx: TypeIndex) -> bool {
        matches!(self.get(idx).kind, TypeKind::LValueRef(_) | TypeKind::RValueRef(_))
    }

    pub fn is_class(&self, idx: TypeIndex) -> bool {
        matches!(self.get(idx).kind, TypeKind::Record(_))
    }

    /// `T` with every reference layer stripped off, following §3.3's model
    /// of lvalue/rvalue references as a type modifier rather than a wrapper
    /// object.
    pub fn strip_references(&self, mut idx: TypeIndex) -> TypeIndex {
        while let TypeKind::LValueRef(inner) | TypeKind::RValueRef(inner) = self.get(idx).kind {
            idx = inner;
        }
        idx
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    if align == 0 {
        return offset;
    }
    (offset + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_util::Idx;

    #[test]
    fn void_is_type_index_zero() {
        let table = TypeTable::new();
        assert_eq!(table.void().index(), 0);
    }

    #[test]
    fn primitive_lookup_is_stable_across_calls() {
        let table = TypeTable::new();
        assert_eq!(table.builtin(BuiltinKind::Int), table.builtin(BuiltinKind::Int));
        assert_ne!(table.builtin(BuiltinKind::Int), table.builtin(BuiltinKind::Double));
    }

    #[test]
    fn pointer_to_is_interned() {
        let mut table = TypeTable::new();
        let int = table.builtin(BuiltinKind::Int);
        let p1 = table.pointer_to(int, CvQualifiers::default());
        let p2 = table.pointer_to(int, CvQualifiers::default());
        assert_eq!(p1, p2);
    }

    #[test]
    fn struct_layout_packs_members_with_alignment() {
        let mut table = TypeTable::new();
        let mut interner = flashcpp_util::StringInterner::new();
        let decl = DeclId::from_usize(0);
        let name = interner.intern("S");
        table.register_struct(decl, name, flashcpp_par::RecordKind::Struct);

        let char_ty = table.builtin(BuiltinKind::Char);
        let int_ty = table.builtin(BuiltinKind::Int);
        let field_a = interner.intern("a");
        let field_b = interner.intern("b");
        table.add_member(decl, field_a, char_ty, AccessSpec::Public, false).unwrap();
        table.add_member(decl, field_b, int_ty, AccessSpec::Public, false).unwrap();
        table.freeze_struct(decl);

        let info = table.struct_info(decl).unwrap();
        assert_eq!(info.members[&field_a].offset, 0);
        assert_eq!(info.members[&field_b].offset, 4, "int field pads past the 1-byte char");
        assert_eq!(info.size, 8);
    }

    #[test]
    fn adding_member_after_freeze_is_an_error() {
        let mut table = TypeTable::new();
        let mut interner = flashcpp_util::StringInterner::new();
        let decl = DeclId::from_usize(0);
        let name = interner.intern("S");
        table.register_struct(decl, name, flashcpp_par::RecordKind::Struct);
        table.freeze_struct(decl);

        let int_ty = table.builtin(BuiltinKind::Int);
        let field = interner.intern("late");
        assert!(table.add_member(decl, field, int_ty, AccessSpec::Public, false).is_err());
    }
}
