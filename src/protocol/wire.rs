//! Wire-level message representation and binary codec
//!
//! Messages follow the Wayland framing: a 32-bit sender object id, then a
//! 32-bit word holding `size << 16 | opcode`, then the arguments, each
//! aligned to 32 bits. Strings and arrays carry a 32-bit length prefix and
//! are padded to the next word boundary. Strings include their NUL
//! terminator in the length; a null string is encoded as length zero.

use super::object::ObjectId;
use std::ffi::CString;
use std::fmt;
use std::mem::discriminant;
use std::os::unix::io::{AsRawFd, RawFd};
use thiserror::Error;
pub use wayland_backend::protocol::{AllowNull, ArgumentType};

/// Size of the message header in bytes
pub const HEADER_SIZE: usize = 8;

/// Upper bound of a single message, including the header
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Signed 24.8 fixed-point number
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fixed(i32);

impl Fixed {
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn from_f64(value: f64) -> Self {
        Self((value * 256.0).round() as i32)
    }

    pub fn from_int(value: i32) -> Self {
        Self(value.wrapping_mul(256))
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 256.0
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// A decoded argument value
///
/// File descriptors are never carried, so the fd slot is uninhabited. A null
/// object is [`ObjectId::NULL`].
pub type Argument = wayland_backend::protocol::Argument<ObjectId, NoFd>;

/// Uninhabited fd slot; `AsRawFd` is required for `Argument: PartialEq`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoFd {}

impl AsRawFd for NoFd {
    fn as_raw_fd(&self) -> RawFd {
        match *self {}
    }
}

/// Constructors and inspection for [`Argument`]
pub trait ArgumentExt: Sized {
    /// A non-null string; anything after an interior NUL is dropped
    fn string(value: impl Into<String>) -> Self;
    fn object(id: ObjectId) -> Self;
    fn null_object() -> Self;
    fn fixed(value: f64) -> Self;
    fn array(bytes: Vec<u8>) -> Self;
    /// Argument type, reporting strings and objects as nullable
    fn kind(&self) -> ArgumentType;
    fn is_null(&self) -> bool;
}

impl ArgumentExt for Argument {
    fn string(value: impl Into<String>) -> Self {
        let mut bytes = value.into().into_bytes();
        if let Some(nul) = bytes.iter().position(|b| *b == 0) {
            bytes.truncate(nul);
        }
        Argument::Str(Some(Box::new(CString::new(bytes).unwrap_or_default())))
    }

    fn object(id: ObjectId) -> Self {
        Argument::Object(id)
    }

    fn null_object() -> Self {
        Argument::Object(ObjectId::NULL)
    }

    fn fixed(value: f64) -> Self {
        Argument::Fixed(Fixed::from_f64(value).raw())
    }

    fn array(bytes: Vec<u8>) -> Self {
        Argument::Array(Box::new(bytes))
    }

    fn kind(&self) -> ArgumentType {
        match self {
            Argument::Int(_) => ArgumentType::Int,
            Argument::Uint(_) => ArgumentType::Uint,
            Argument::Fixed(_) => ArgumentType::Fixed,
            Argument::Str(_) => ArgumentType::Str(AllowNull::Yes),
            Argument::Object(_) => ArgumentType::Object(AllowNull::Yes),
            Argument::NewId(_) => ArgumentType::NewId,
            Argument::Array(_) => ArgumentType::Array,
            Argument::Fd(never) => match *never {},
        }
    }

    fn is_null(&self) -> bool {
        match self {
            Argument::Str(s) => s.is_none(),
            Argument::Object(id) => id.is_null(),
            _ => false,
        }
    }
}

/// Same argument type, ignoring whether null is allowed
fn same_kind(a: ArgumentType, b: ArgumentType) -> bool {
    discriminant(&a) == discriminant(&b)
}

/// One request or event on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender: ObjectId,
    pub opcode: u16,
    pub args: Vec<Argument>,
}

impl Message {
    pub fn new(sender: ObjectId, opcode: u16, args: Vec<Argument>) -> Self {
        Self {
            sender,
            opcode,
            args,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("message truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("message size {0} is invalid")]
    InvalidSize(usize),
    #[error("argument {index} expected {expected:?}, found {found:?}")]
    TypeMismatch {
        index: usize,
        expected: ArgumentType,
        found: ArgumentType,
    },
    #[error("expected {expected} arguments, found {found}")]
    ArgumentCount { expected: usize, found: usize },
    #[error("argument {0} is null but not nullable")]
    UnexpectedNull(usize),
    #[error("string argument {0} is not valid UTF-8 or lacks a terminator")]
    MalformedString(usize),
    #[error("argument {0} is a file descriptor, which is not supported")]
    Unsupported(usize),
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("unknown opcode {opcode} on object {object}")]
    UnknownOpcode { object: ObjectId, opcode: u16 },
}

/// Checks decoded argument values against a signature
pub fn check_signature(signature: &[ArgumentType], args: &[Argument]) -> Result<(), WireError> {
    if signature.len() != args.len() {
        return Err(WireError::ArgumentCount {
            expected: signature.len(),
            found: args.len(),
        });
    }

    for (index, (expected, arg)) in signature.iter().zip(args).enumerate() {
        if !same_kind(*expected, arg.kind()) {
            return Err(WireError::TypeMismatch {
                index,
                expected: *expected,
                found: arg.kind(),
            });
        }
        let nullable = matches!(
            expected,
            ArgumentType::Str(AllowNull::Yes) | ArgumentType::Object(AllowNull::Yes)
        );
        if arg.is_null() && !nullable {
            return Err(WireError::UnexpectedNull(index));
        }
    }

    Ok(())
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

/// Encodes a message into its binary representation
pub fn encode(message: &Message) -> Vec<u8> {
    let mut body = Vec::with_capacity(32);

    for arg in &message.args {
        match arg {
            Argument::Int(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Argument::Uint(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Argument::Fixed(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Argument::Object(id) | Argument::NewId(id) => {
                body.extend_from_slice(&id.protocol_id().to_ne_bytes())
            }
            Argument::Str(None) => body.extend_from_slice(&0u32.to_ne_bytes()),
            Argument::Str(Some(s)) => {
                let bytes = s.as_bytes_with_nul();
                body.extend_from_slice(&(bytes.len() as u32).to_ne_bytes());
                body.extend_from_slice(bytes);
                body.resize(body.len() + padded(bytes.len()) - bytes.len(), 0);
            }
            Argument::Array(bytes) => {
                body.extend_from_slice(&(bytes.len() as u32).to_ne_bytes());
                body.extend_from_slice(bytes);
                body.resize(body.len() + padded(bytes.len()) - bytes.len(), 0);
            }
            Argument::Fd(never) => match *never {},
        }
    }

    let size = HEADER_SIZE + body.len();
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&message.sender.protocol_id().to_ne_bytes());
    out.extend_from_slice(&(((size as u32) << 16) | message.opcode as u32).to_ne_bytes());
    out.extend_from_slice(&body);
    out
}

/// Reads the header of the next message: `(sender, opcode, total size)`
pub fn peek_header(bytes: &[u8]) -> Result<(ObjectId, u16, usize), WireError> {
    if bytes.len() < HEADER_SIZE {
        return Err(WireError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let sender = read_u32(bytes, 0);
    let word = read_u32(bytes, 4);
    let size = (word >> 16) as usize;
    let opcode = (word & 0xffff) as u16;

    if size < HEADER_SIZE || size % 4 != 0 || size > MAX_MESSAGE_SIZE {
        return Err(WireError::InvalidSize(size));
    }
    if bytes.len() < size {
        return Err(WireError::Truncated {
            needed: size,
            available: bytes.len(),
        });
    }

    Ok((ObjectId::new(sender), opcode, size))
}

/// Decodes one message whose signature is already known
///
/// Returns the message and the number of bytes consumed.
pub fn decode(bytes: &[u8], signature: &[ArgumentType]) -> Result<(Message, usize), WireError> {
    let (sender, opcode, size) = peek_header(bytes)?;
    let frame = &bytes[..size];
    let mut offset = HEADER_SIZE;
    let mut args = Vec::with_capacity(signature.len());

    for (index, kind) in signature.iter().enumerate() {
        let word = take_word(frame, &mut offset)?;
        let arg = match kind {
            ArgumentType::Int => Argument::Int(word as i32),
            ArgumentType::Uint => Argument::Uint(word),
            ArgumentType::Fixed => Argument::Fixed(word as i32),
            ArgumentType::Object(_) => Argument::Object(ObjectId::new(word)),
            ArgumentType::NewId => Argument::NewId(ObjectId::new(word)),
            ArgumentType::Str(_) => {
                let len = word as usize;
                if len == 0 {
                    Argument::Str(None)
                } else {
                    let raw = take_bytes(frame, &mut offset, len)?;
                    if std::str::from_utf8(&raw[..len - 1]).is_err() {
                        return Err(WireError::MalformedString(index));
                    }
                    let text = CString::from_vec_with_nul(raw.to_vec())
                        .map_err(|_| WireError::MalformedString(index))?;
                    Argument::Str(Some(Box::new(text)))
                }
            }
            ArgumentType::Array => {
                let len = word as usize;
                Argument::array(take_bytes(frame, &mut offset, len)?.to_vec())
            }
            ArgumentType::Fd => return Err(WireError::Unsupported(index)),
        };
        args.push(arg);
    }

    if offset != size {
        return Err(WireError::InvalidSize(size));
    }

    check_signature(signature, &args)?;
    Ok((Message::new(sender, opcode, args), size))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_ne_bytes(word)
}

fn take_word(frame: &[u8], offset: &mut usize) -> Result<u32, WireError> {
    if *offset + 4 > frame.len() {
        return Err(WireError::Truncated {
            needed: *offset + 4,
            available: frame.len(),
        });
    }
    let word = read_u32(frame, *offset);
    *offset += 4;
    Ok(word)
}

fn take_bytes<'a>(frame: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8], WireError> {
    let end = *offset + padded(len);
    if end > frame.len() {
        return Err(WireError::Truncated {
            needed: end,
            available: frame.len(),
        });
    }
    let bytes = &frame[*offset..*offset + len];
    *offset = end;
    Ok(bytes)
}

/// Sequential typed access to already-validated request arguments
#[derive(Debug)]
pub struct ArgReader<'a> {
    args: &'a [Argument],
    index: usize,
}

impl<'a> ArgReader<'a> {
    pub fn new(args: &'a [Argument]) -> Self {
        Self { args, index: 0 }
    }

    fn next(&mut self, expected: ArgumentType) -> Result<&'a Argument, WireError> {
        let arg = self.args.get(self.index).ok_or(WireError::ArgumentCount {
            expected: self.index + 1,
            found: self.args.len(),
        })?;
        if !same_kind(arg.kind(), expected) {
            return Err(WireError::TypeMismatch {
                index: self.index,
                expected,
                found: arg.kind(),
            });
        }
        self.index += 1;
        Ok(arg)
    }

    pub fn int(&mut self) -> Result<i32, WireError> {
        match self.next(ArgumentType::Int)? {
            Argument::Int(v) => Ok(*v),
            _ => unreachable!("kind checked by next()"),
        }
    }

    pub fn uint(&mut self) -> Result<u32, WireError> {
        match self.next(ArgumentType::Uint)? {
            Argument::Uint(v) => Ok(*v),
            _ => unreachable!("kind checked by next()"),
        }
    }

    pub fn fixed(&mut self) -> Result<Fixed, WireError> {
        match self.next(ArgumentType::Fixed)? {
            Argument::Fixed(v) => Ok(Fixed::from_raw(*v)),
            _ => unreachable!("kind checked by next()"),
        }
    }

    pub fn string(&mut self) -> Result<String, WireError> {
        let index = self.index;
        self.optional_string()?
            .ok_or(WireError::UnexpectedNull(index))
    }

    pub fn optional_string(&mut self) -> Result<Option<String>, WireError> {
        let index = self.index;
        match self.next(ArgumentType::Str(AllowNull::Yes))? {
            Argument::Str(None) => Ok(None),
            Argument::Str(Some(text)) => text
                .to_str()
                .map(|t| Some(t.to_owned()))
                .map_err(|_| WireError::MalformedString(index)),
            _ => unreachable!("kind checked by next()"),
        }
    }

    pub fn object(&mut self) -> Result<ObjectId, WireError> {
        let index = self.index;
        self.optional_object()?
            .ok_or(WireError::UnexpectedNull(index))
    }

    pub fn optional_object(&mut self) -> Result<Option<ObjectId>, WireError> {
        match self.next(ArgumentType::Object(AllowNull::Yes))? {
            Argument::Object(id) => Ok((!id.is_null()).then_some(*id)),
            _ => unreachable!("kind checked by next()"),
        }
    }

    pub fn new_id(&mut self) -> Result<ObjectId, WireError> {
        match self.next(ArgumentType::NewId)? {
            Argument::NewId(v) => Ok(*v),
            _ => unreachable!("kind checked by next()"),
        }
    }

    pub fn array(&mut self) -> Result<Vec<u8>, WireError> {
        match self.next(ArgumentType::Array)? {
            Argument::Array(v) => Ok(v.to_vec()),
            _ => unreachable!("kind checked by next()"),
        }
    }
}
