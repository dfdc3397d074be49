use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ast::{
        expressions::Expr,
        statements::{ClassDecl, FunctionDecl, Stmt, StmtKind},
        types::{SymbolType, Type},
    },
    errors::errors::{Error, ErrorImpl},
    runtime::memory::{GLOBALS_START, HEAP_START},
    Position,
};

/// Bytes per slot: every global, field and value is one 64-bit word.
pub const WORD_SIZE: u32 = 8;

/// Reserved method name marking a class constructor.
pub const CONSTRUCTOR_NAME: &str = "__init__";

/// Signature of a free function, method or constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    /// Parameter names and types in order. For methods, the receiver comes first.
    pub params: Vec<(String, Type)>,
    pub ret: Type,
    /// `None` for builtins and synthesized constructors.
    pub decl: Option<Rc<FunctionDecl>>,
}

impl FuncSig {
    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(|(_, ty)| ty.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    pub name: String,
    /// Runtime identification only; never used for dispatch.
    pub table_id: u32,
    /// Field order fixes the byte offset: index * 8.
    pub members: IndexMap<String, (Expr, Type)>,
    pub ctor: FuncSig,
    pub methods: IndexMap<String, FuncSig>,
    pub decl: Rc<ClassDecl>,
}

impl ClassLayout {
    pub fn size(&self) -> u32 {
        self.members.len() as u32 * WORD_SIZE
    }
}

/// Symbols that survive between compilation turns.
///
/// A turn never edits the environment it was given; `augment_env` derives a
/// new one, so a failed turn leaves the previous environment usable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalEnv {
    pub globals: HashMap<String, (Type, u32)>,
    pub funcs: HashMap<String, FuncSig>,
    pub classes: HashMap<String, ClassLayout>,
    pub next_offset: u32,
    pub next_class_id: u32,
}

impl GlobalEnv {
    /// Environment holding only the builtins `print` and `len`.
    pub fn new() -> Self {
        let mut funcs = HashMap::new();

        funcs.insert(
            String::from("print"),
            FuncSig {
                params: vec![(String::from("value"), Type::None)],
                ret: Type::None,
                decl: None,
            },
        );
        funcs.insert(
            String::from("len"),
            FuncSig {
                params: vec![(String::from("s"), Type::Str)],
                ret: Type::Int,
                decl: None,
            },
        );

        GlobalEnv {
            globals: HashMap::new(),
            funcs,
            classes: HashMap::new(),
            next_offset: GLOBALS_START,
            next_class_id: 0,
        }
    }

    /// `(table id, class name)` pairs, for the runtime's class table.
    pub fn class_names(&self) -> Vec<(u32, String)> {
        let mut names = self
            .classes
            .values()
            .map(|class| (class.table_id, class.name.clone()))
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl Default for GlobalEnv {
    fn default() -> Self {
        GlobalEnv::new()
    }
}

/// Procedure name of a method: `Class$method`.
pub fn mangle(class: &str, method: &str) -> String {
    format!("{}${}", class, method)
}

pub fn resolve_type(env: &GlobalEnv, annotation: &SymbolType) -> Result<Type, Error> {
    match annotation.name.as_str() {
        "int" => Ok(Type::Int),
        "bool" => Ok(Type::Bool),
        "str" => Ok(Type::Str),
        "None" => Ok(Type::None),
        name if env.classes.contains_key(name) => Ok(Type::Class(name.to_string())),
        name => Err(Error::new(
            ErrorImpl::UnknownType {
                type_: name.to_string(),
            },
            annotation.position,
        )),
    }
}

pub fn resolve_global<'a>(
    position: Position,
    env: &'a GlobalEnv,
    name: &str,
) -> Result<&'a (Type, u32), Error> {
    env.globals.get(name).ok_or_else(|| {
        Error::new(
            ErrorImpl::GlobalNotFound {
                variable: name.to_string(),
            },
            position,
        )
    })
}

/// Whether `name` is a parameter or local of the function being checked.
pub fn is_local<V>(locals: &IndexMap<String, V>, name: &str) -> bool {
    locals.contains_key(name)
}

/// Byte offset of `field` inside an instance of `class`.
pub fn field_offset(
    env: &GlobalEnv,
    class: &str,
    field: &str,
    position: Position,
) -> Result<u32, Error> {
    env.classes
        .get(class)
        .and_then(|layout| layout.members.get_index_of(field))
        .map(|index| index as u32 * WORD_SIZE)
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::MemberNotFound {
                    class: class.to_string(),
                    member: field.to_string(),
                },
                position,
            )
        })
}

/// Registers the snippet's top-level declarations on a copy of `env`.
///
/// Only top-level statements are visited: defines get the next free global
/// slot, functions their signature and classes their layout. Every define
/// gets a slot of its own, so a name defined twice ends up bound to the
/// later slot. Classes are
/// registered before anything else so annotations may name a class declared
/// further down the snippet.
pub fn augment_env(env: &GlobalEnv, program: &[Stmt]) -> Result<GlobalEnv, Error> {
    let mut new_env = env.clone();
    let mut declared: HashSet<String> = HashSet::new();

    // Class and function names first, so signatures can refer to any class
    for stmt in program {
        let (name, is_class) = match &stmt.kind {
            StmtKind::Class(decl) => (&decl.name, true),
            StmtKind::Function(decl) => (&decl.name, false),
            _ => continue,
        };

        if !declared.insert(name.value.clone()) {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: name.value.clone(),
                },
                name.position,
            ));
        }

        if is_class {
            let table_id = match new_env.classes.get(&name.value) {
                Some(previous) => previous.table_id,
                None => {
                    new_env.next_class_id += 1;
                    new_env.next_class_id - 1
                }
            };

            if let StmtKind::Class(decl) = &stmt.kind {
                forget_class(&mut new_env, &name.value);
                new_env.funcs.remove(&name.value);
                new_env
                    .classes
                    .insert(name.value.clone(), placeholder_layout(decl, table_id));
            }
        } else {
            forget_class(&mut new_env, &name.value);
        }
    }

    for stmt in program {
        match &stmt.kind {
            StmtKind::Define(decl) => {
                let ty = resolve_type(&new_env, &decl.annotation)?;
                if ty == Type::None {
                    return Err(Error::new(
                        ErrorImpl::NoneTypedVariable {
                            variable: decl.name.value.clone(),
                        },
                        decl.annotation.position,
                    ));
                }

                let offset = new_env.next_offset;
                if offset + WORD_SIZE > HEAP_START {
                    return Err(Error::new(
                        ErrorImpl::GlobalRegionExhausted {
                            limit: (HEAP_START - GLOBALS_START) / WORD_SIZE,
                        },
                        decl.name.position,
                    ));
                }

                new_env
                    .globals
                    .insert(decl.name.value.clone(), (ty, offset));
                new_env.next_offset += WORD_SIZE;
            }
            StmtKind::Function(decl) => {
                let sig = function_sig(&new_env, decl)?;
                new_env.funcs.insert(decl.name.value.clone(), sig);
            }
            StmtKind::Class(decl) => {
                let layout = class_layout(&new_env, decl)?;
                for (method, sig) in &layout.methods {
                    new_env
                        .funcs
                        .insert(mangle(&layout.name, method), sig.clone());
                }
                new_env
                    .funcs
                    .insert(mangle(&layout.name, CONSTRUCTOR_NAME), layout.ctor.clone());
                new_env.classes.insert(layout.name.clone(), layout);
            }
            _ => {}
        }
    }

    debug!(
        globals = new_env.globals.len(),
        funcs = new_env.funcs.len(),
        classes = new_env.classes.len(),
        next_offset = new_env.next_offset,
        "augmented environment"
    );

    Ok(new_env)
}

/// Drops a previous class called `name` along with its mangled procedures.
fn forget_class(env: &mut GlobalEnv, name: &str) {
    if env.classes.remove(name).is_some() {
        let prefix = mangle(name, "");
        env.funcs.retain(|func, _| !func.starts_with(&prefix));
    }
}

/// Registers the class name so annotations resolve while layouts are built.
fn placeholder_layout(decl: &Rc<ClassDecl>, table_id: u32) -> ClassLayout {
    ClassLayout {
        name: decl.name.value.clone(),
        table_id,
        members: IndexMap::new(),
        ctor: FuncSig {
            params: vec![],
            ret: Type::None,
            decl: None,
        },
        methods: IndexMap::new(),
        decl: Rc::clone(decl),
    }
}

fn function_sig(env: &GlobalEnv, decl: &Rc<FunctionDecl>) -> Result<FuncSig, Error> {
    let mut params = vec![];
    let mut seen = HashSet::new();

    for param in &decl.params {
        if !seen.insert(param.name.value.as_str()) {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: param.name.value.clone(),
                },
                param.name.position,
            ));
        }

        let ty = resolve_type(env, &param.annotation)?;
        if ty == Type::None {
            return Err(Error::new(
                ErrorImpl::NoneTypedVariable {
                    variable: param.name.value.clone(),
                },
                param.annotation.position,
            ));
        }
        params.push((param.name.value.clone(), ty));
    }

    let ret = match &decl.return_type {
        Some(annotation) => resolve_type(env, annotation)?,
        None => Type::None,
    };

    Ok(FuncSig {
        params,
        ret,
        decl: Some(Rc::clone(decl)),
    })
}

fn method_sig(env: &GlobalEnv, class: &str, decl: &Rc<FunctionDecl>) -> Result<FuncSig, Error> {
    let is_constructor = decl.name.value == CONSTRUCTOR_NAME;

    if is_constructor && decl.params.len() != 1 {
        return Err(Error::new(
            ErrorImpl::InvalidConstructorSignature {
                class: class.to_string(),
                received: decl.params.len(),
            },
            decl.name.position,
        ));
    }

    if is_constructor {
        if let Some(annotation) = &decl.return_type {
            return Err(Error::new(
                ErrorImpl::ConstructorReturnType {
                    class: class.to_string(),
                },
                annotation.position,
            ));
        }
    }

    let receiver = decl.params.first().ok_or_else(|| {
        Error::new(
            ErrorImpl::MissingReceiver {
                method: decl.name.value.clone(),
            },
            decl.name.position,
        )
    })?;

    let sig = function_sig(env, decl)?;
    let expected = Type::Class(class.to_string());

    if sig.params[0].1 != expected {
        return Err(Error::new(
            ErrorImpl::InvalidReceiver {
                method: decl.name.value.clone(),
                expected: expected.to_string(),
                received: sig.params[0].1.to_string(),
            },
            receiver.annotation.position,
        ));
    }

    Ok(sig)
}

fn class_layout(env: &GlobalEnv, decl: &Rc<ClassDecl>) -> Result<ClassLayout, Error> {
    let name = decl.name.value.clone();
    let table_id = env
        .classes
        .get(&name)
        .map(|layout| layout.table_id)
        .ok_or_else(|| Error::internal(format!("class `{}` was not pre-registered", name)))?;

    let mut members = IndexMap::new();
    for field in &decl.fields {
        let ty = resolve_type(env, &field.annotation)?;
        if ty == Type::None {
            return Err(Error::new(
                ErrorImpl::NoneTypedVariable {
                    variable: field.name.value.clone(),
                },
                field.annotation.position,
            ));
        }

        if members
            .insert(field.name.value.clone(), (field.value.clone(), ty))
            .is_some()
        {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: field.name.value.clone(),
                },
                field.name.position,
            ));
        }
    }

    let mut ctor = None;
    let mut methods: IndexMap<String, FuncSig> = IndexMap::new();

    for method in &decl.methods {
        let sig = method_sig(env, &name, method)?;

        let first = if method.name.value == CONSTRUCTOR_NAME {
            ctor.as_ref().map(|sig: &FuncSig| sig.decl.clone())
        } else {
            methods.get(&method.name.value).map(|sig| sig.decl.clone())
        };

        if let Some(first) = first {
            return Err(Error::new(
                ErrorImpl::MethodRedefined {
                    class: name.clone(),
                    method: method.name.value.clone(),
                    first_line: first.map(|decl| decl.name.position.line).unwrap_or(0),
                },
                method.name.position,
            ));
        }

        if method.name.value == CONSTRUCTOR_NAME {
            ctor = Some(sig);
        } else {
            methods.insert(method.name.value.clone(), sig);
        }
    }

    // Classes without `__init__` get an empty constructor
    let ctor = ctor.unwrap_or_else(|| FuncSig {
        params: vec![(String::from("self"), Type::Class(name.clone()))],
        ret: Type::None,
        decl: None,
    });

    Ok(ClassLayout {
        name,
        table_id,
        members,
        ctor,
        methods,
        decl: Rc::clone(decl),
    })
}

/// Slot `augment_env` gave the first top-level define of `program`; the
/// others follow one word apart in program order.
pub fn first_define_offset(env: &GlobalEnv, program: &[Stmt]) -> u32 {
    let defines = program
        .iter()
        .filter(|stmt| matches!(stmt.kind, StmtKind::Define(_)))
        .count() as u32;
    env.next_offset - defines * WORD_SIZE
}
