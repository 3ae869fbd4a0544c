use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::rc::Rc;

use crate::runner::ds::native::{MemberKind, NativeMember};

/// Unseeded hashing, so a script iterates its maps and sets in the same
/// order on every run.
pub type ValueHasher = BuildHasherDefault<DefaultHasher>;
pub type ValueMap = HashMap<Value, Value, ValueHasher>;
pub type ValueSet = HashSet<Value, ValueHasher>;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<ValueMap>>;
pub type SetRef = Rc<RefCell<ValueSet>>;

/// How far hashing, equality and rendering descend into nested
/// containers.
const MAX_NESTING: usize = 128;

/// A script value. Primitives and their boxes share a variant; the static
/// type decides which one the compiler sees.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Rc<str>),
    List(ListRef),
    Map(MapRef),
    Set(SetRef),
    Array(Rc<ArrayValue>),
    Function(Rc<FunctionValue>),
    Iterator(Rc<RefCell<IteratorState>>),
}

pub struct ArrayValue {
    /// Full type name, e.g. `int[]` or `String[][]`.
    pub type_name: String,
    pub elements: RefCell<Vec<Value>>,
}

impl ArrayValue {
    pub fn component_name(&self) -> &str {
        &self.type_name[..self.type_name.len() - 2]
    }
}

/// Iterators walk a snapshot taken when they were created.
pub struct IteratorState {
    pub items: Vec<Value>,
    pub position: usize,
}

impl IteratorState {
    pub fn next(&mut self) -> Option<Value> {
        let item = self.items.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }

    pub fn has_next(&self) -> bool {
        self.position < self.items.len()
    }
}

/// A lambda, function reference or local function handle.
pub struct FunctionValue {
    /// Functional interface the value implements; `None` when it was
    /// produced for a `def` target.
    pub interface: Option<String>,
    pub target: FunctionTarget,
}

pub enum FunctionTarget {
    /// A compiled function of the running program, with captured values
    /// passed ahead of the call arguments.
    Script { function: usize, captures: Vec<Value> },
    /// A whitelisted native member. Instance methods take their receiver
    /// from the first argument.
    Native(&'static NativeMember),
    /// `Owner::method` with no known target arity; resolved per call.
    Deferred { owner: String, method: String },
    /// A native member applied to a fixed receiver, e.g. a negated
    /// predicate wrapping the original one.
    Bound { member: &'static NativeMember, receiver: Value },
}

impl fmt::Debug for FunctionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FunctionTarget::Script { function, captures } => {
                write!(f, "Script(#{}, {} captures)", function, captures.len())
            }
            FunctionTarget::Native(member) => match member.kind {
                MemberKind::Constructor => write!(f, "Native(new/{})", member.arity()),
                _ => write!(f, "Native({}/{})", member.name, member.arity()),
            },
            FunctionTarget::Deferred { owner, method } => {
                write!(f, "Deferred({}::{})", owner, method)
            }
            FunctionTarget::Bound { member, .. } => write!(f, "Bound({})", member.name),
        }
    }
}

impl Value {
    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn new_list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn new_map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn new_set(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn new_array(type_name: String, elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(ArrayValue {
            type_name,
            elements: RefCell::new(elements),
        }))
    }

    pub fn new_iterator(items: Vec<Value>) -> Value {
        Value::Iterator(Rc::new(RefCell::new(IteratorState { items, position: 0 })))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Char(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
        )
    }

    /// Name of the native class backing this value, as known to the
    /// native catalogue. Arrays report their full type name.
    pub fn class_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "Boolean".to_string(),
            Value::Byte(_) => "Byte".to_string(),
            Value::Short(_) => "Short".to_string(),
            Value::Char(_) => "Character".to_string(),
            Value::Int(_) => "Integer".to_string(),
            Value::Long(_) => "Long".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Double(_) => "Double".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::List(_) => "ArrayList".to_string(),
            Value::Map(_) => "HashMap".to_string(),
            Value::Set(_) => "HashSet".to_string(),
            Value::Array(a) => a.type_name.clone(),
            Value::Function(f) => match &f.interface {
                Some(name) => format!("$Lambda<{}>", name),
                None => "$Lambda".to_string(),
            },
            Value::Iterator(_) => "SnapshotIterator".to_string(),
        }
    }

    fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(Rc::as_ptr(a) as *const u8 as usize),
            Value::Function(f) => Some(Rc::as_ptr(f) as *const u8 as usize),
            Value::Iterator(i) => Some(Rc::as_ptr(i) as *const u8 as usize),
            _ => None,
        }
    }

    /// Address of the shared storage of a list, map or set.
    fn container_id(&self) -> Option<usize> {
        match self {
            Value::List(l) => Some(Rc::as_ptr(l) as *const u8 as usize),
            Value::Map(m) => Some(Rc::as_ptr(m) as *const u8 as usize),
            Value::Set(s) => Some(Rc::as_ptr(s) as *const u8 as usize),
            _ => None,
        }
    }

    /// Reference identity (`===`). Values without identity compare by
    /// content.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    pub fn hash_code(&self) -> i32 {
        self.hash_within(&mut vec![])
    }

    /// Containers already on `trail`, or being mutated, hash as zero.
    fn hash_within(&self, trail: &mut Vec<usize>) -> i32 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => {
                if *b {
                    1231
                } else {
                    1237
                }
            }
            Value::Byte(v) => *v as i32,
            Value::Short(v) => *v as i32,
            Value::Char(v) => *v as i32,
            Value::Int(v) => *v,
            Value::Long(v) => (*v ^ ((*v as u64) >> 32) as i64) as i32,
            Value::Float(v) => v.to_bits() as i32,
            Value::Double(v) => {
                let bits = v.to_bits();
                (bits ^ (bits >> 32)) as i32
            }
            Value::Str(s) => s
                .encode_utf16()
                .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32)),
            Value::List(_) | Value::Map(_) | Value::Set(_) => {
                let id = self.container_id().unwrap_or(0);
                if trail.contains(&id) || trail.len() >= MAX_NESTING {
                    return 0;
                }
                trail.push(id);
                let hash = match self {
                    Value::List(l) => l.try_borrow().map_or(0, |items| {
                        items
                            .iter()
                            .fold(1i32, |h, v| h.wrapping_mul(31).wrapping_add(v.hash_within(trail)))
                    }),
                    Value::Map(m) => m.try_borrow().map_or(0, |entries| {
                        entries.iter().fold(0i32, |h, (k, v)| {
                            h.wrapping_add(k.hash_within(trail) ^ v.hash_within(trail))
                        })
                    }),
                    Value::Set(s) => s.try_borrow().map_or(0, |items| {
                        items.iter().fold(0i32, |h, v| h.wrapping_add(v.hash_within(trail)))
                    }),
                    _ => 0,
                };
                trail.pop();
                hash
            }
            other => other.identity().unwrap_or(0) as i32,
        }
    }

    /// Content equality. Pairs of containers already on `trail` are
    /// taken as equal, which ends the comparison of cyclic structures.
    fn equals_within(&self, other: &Value, trail: &mut Vec<(usize, usize)>) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => nested_eq(a, b, trail, |x, y, trail| {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| p.equals_within(q, trail))
            }),
            (Value::Map(a), Value::Map(b)) => nested_eq(a, b, trail, |x, y, trail| {
                x.len() == y.len()
                    && x.iter().all(|(k, v)| match y.get(k) {
                        Some(w) => v.equals_within(w, trail),
                        None => false,
                    })
            }),
            (Value::Set(a), Value::Set(b)) => {
                nested_eq(a, b, trail, |x, y, _| x.len() == y.len() && x.iter().all(|v| y.contains(v)))
            }
            _ => scalar_eq(self, other),
        }
    }

    /// Java-style rendering. A container met again inside itself prints
    /// as `(this Collection)` or `(this Map)`.
    fn render(&self, f: &mut Formatter<'_>, trail: &mut Vec<usize>) -> fmt::Result {
        let id = match self.container_id() {
            Some(id) => id,
            None => return write!(f, "{}", self),
        };
        if trail.contains(&id) {
            return match self {
                Value::Map(_) => write!(f, "(this Map)"),
                _ => write!(f, "(this Collection)"),
            };
        }
        if trail.len() >= MAX_NESTING {
            return write!(f, "...");
        }
        trail.push(id);
        let result = match self {
            Value::List(l) => match l.try_borrow() {
                Ok(items) => render_items(f, items.iter(), trail),
                Err(_) => write!(f, "(this Collection)"),
            },
            Value::Set(s) => match s.try_borrow() {
                Ok(items) => render_items(f, items.iter(), trail),
                Err(_) => write!(f, "(this Collection)"),
            },
            Value::Map(m) => match m.try_borrow() {
                Ok(entries) => {
                    write!(f, "{{")?;
                    for (i, (k, v)) in entries.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        k.render(f, trail)?;
                        write!(f, "=")?;
                        v.render(f, trail)?;
                    }
                    write!(f, "}}")
                }
                Err(_) => write!(f, "(this Map)"),
            },
            _ => Ok(()),
        };
        trail.pop();
        result
    }
}

fn nested_eq<T>(
    a: &Rc<RefCell<T>>,
    b: &Rc<RefCell<T>>,
    trail: &mut Vec<(usize, usize)>,
    same: impl FnOnce(&T, &T, &mut Vec<(usize, usize)>) -> bool,
) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let key = (Rc::as_ptr(a) as *const u8 as usize, Rc::as_ptr(b) as *const u8 as usize);
    if trail.contains(&key) {
        return true;
    }
    if trail.len() >= MAX_NESTING {
        return false;
    }
    let (x, y) = match (a.try_borrow(), b.try_borrow()) {
        (Ok(x), Ok(y)) => (x, y),
        _ => return false,
    };
    trail.push(key);
    let equal = same(&x, &y, trail);
    trail.pop();
    equal
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Byte(a), Value::Byte(b)) => a == b,
        (Value::Short(a), Value::Short(b)) => a == b,
        (Value::Char(a), Value::Char(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Long(a), Value::Long(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
        (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => match (a.identity(), b.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals_within(other, &mut vec![])
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hash_code());
    }
}

/// Formats a double the way `Double.toString` does.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = d.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let s = format!("{}", d);
        if s.contains('.') {
            s
        } else {
            format!("{}.0", s)
        }
    } else {
        scientific(format!("{:e}", d))
    }
}

pub fn format_float(f: f32) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = f.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let s = format!("{}", f);
        if s.contains('.') {
            s
        } else {
            format!("{}.0", s)
        }
    } else {
        scientific(format!("{:e}", f))
    }
}

fn scientific(rust: String) -> String {
    match rust.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{}E{}", mantissa, exponent),
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => rust,
    }
}

fn render_items<'a, I: Iterator<Item = &'a Value>>(
    f: &mut Formatter<'_>,
    items: I,
    trail: &mut Vec<usize>,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.render(f, trail)?;
    }
    write!(f, "]")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Char(c) => write!(f, "{}", String::from_utf16_lossy(&[*c])),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Double(v) => write!(f, "{}", format_double(*v)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) | Value::Set(_) | Value::Map(_) => self.render(f, &mut vec![]),
            other => write!(f, "{}@{:x}", other.class_name(), other.hash_code()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Value::Null"),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::Byte(v) => write!(f, "Value::Byte({})", v),
            Value::Short(v) => write!(f, "Value::Short({})", v),
            Value::Char(v) => write!(f, "Value::Char({:?})", String::from_utf16_lossy(&[*v])),
            Value::Int(v) => write!(f, "Value::Int({})", v),
            Value::Long(v) => write!(f, "Value::Long({})", v),
            Value::Float(v) => write!(f, "Value::Float({})", v),
            Value::Double(v) => write!(f, "Value::Double({})", v),
            Value::Str(s) => write!(f, "Value::Str({:?})", s),
            Value::List(_) | Value::Map(_) | Value::Set(_) => {
                write!(f, "Value::{}({})", self.class_name(), self)
            }
            Value::Array(a) => write!(f, "Value::Array({}, {:?})", a.type_name, a.elements.borrow()),
            Value::Function(func) => write!(f, "Value::Function({:?})", func.target),
            Value::Iterator(_) => write!(f, "Value::Iterator(...)"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v))
    }
}
