use miette::Diagnostic;
use thiserror::Error;

/// Everything the assembler can complain about.
///
/// Most of these are recoverable: the driver reports them, abandons the
/// offending line and keeps going, so one run surfaces as many problems
/// as possible.
#[derive(Debug, Error, Diagnostic)]
pub enum AsmError {
    /// A digit blob that fits no recognized radix.
    #[error("bad number `{0}`")]
    BadNumber(String),

    /// A string or character constant with no closing quote.
    #[error("unterminated string")]
    UnterminatedString,

    /// A string constant over the length bound.
    #[error("string constant too long")]
    StringTooLong,

    /// An identifier over the length bound.
    #[error("name too long")]
    NameTooLong,

    /// A source line over the length bound.
    #[error("line too long")]
    LineTooLong,

    /// A byte no token starts with.
    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),

    /// A `(` with no matching `)`.
    #[error("expected `)`")]
    ExpectedParenthesis,

    /// Tokens left over after a complete statement.
    #[error("unexpected content at end of line")]
    TrailingTokens,

    /// A token that fits no statement shape.
    #[error("syntax error")]
    SyntaxError,

    /// A name that is neither a directive nor an instruction.
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),

    /// `equ` in statement position, with nothing to define.
    #[error("`equ` without a label")]
    EquWithoutLabel,

    /// A name with no definition by pass 2.
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),

    /// The same name defined twice.
    #[error("duplicate definition of `{0}`")]
    DuplicateDefinition(String),

    /// A label or `equ` for a name already declared external.
    #[error("cannot define external symbol `{0}`")]
    DefineExternal(String),

    /// `xref` on a name this file defines.
    #[error("cannot make defined symbol `{0}` external")]
    ExternAfterDefinition(String),

    /// `xdef` on a name declared external.
    #[error("cannot export external symbol `{0}`")]
    ExportExternal(String),

    /// `xdef`/`xref` on an `@`-local name.
    #[error("local label `{0}` cannot be exported or external")]
    LocalVisibility(String),

    /// A relocatable value where only a constant works.
    #[error("relocatable value in {0}")]
    Relocatable(&'static str),

    /// A relocatable value in a field too narrow to patch.
    #[error("use `dl` for relocatable data")]
    UseDl,

    /// A relocatable value under `*` or `/`; addresses cannot be scaled
    /// at link time.
    #[error("relocatable value in multiply or divide")]
    RelocatableMulDiv,

    /// `+` over two relocatable values.
    #[error("cannot add two relocatable values")]
    RelocatableSum,

    /// `-` over two externals, which cannot cancel at assembly time.
    #[error("cannot take the difference of two external symbols")]
    DifferenceOfExternals,

    /// `-` over symbols from two different sections.
    #[error("cannot subtract symbols from different sections")]
    CrossSectionDifference,

    /// Division by zero; the result is taken as 0.
    #[error("division by zero")]
    DivisionByZero,

    /// A `jr`/`djnz` displacement outside -128..=127.
    #[error("relative jump out of range ({0})")]
    JumpOutOfRange(i32),

    /// A `jr`/`djnz` aimed at an external symbol.
    #[error("relative jump to external symbol")]
    JumpToExternal,

    /// An `(IX+d)`/`(IY+d)` displacement outside -128..=127.
    #[error("index displacement out of range ({0})")]
    DisplacementOutOfRange(i32),

    /// IX and IY in the same instruction.
    #[error("cannot mix IX and IY in one instruction")]
    IndexMix,

    /// An index half next to plain H or L.
    #[error("cannot mix an index half with H or L")]
    IndexHalfWithHl,

    /// An operand shape the mnemonic does not have.
    #[error("invalid operands for `{0}`")]
    InvalidOperands(&'static str),

    /// A condition `jr` cannot encode.
    #[error("`jr` only accepts the nz, z, nc and c conditions")]
    InvalidJrCondition,

    /// A `bit`/`set`/`res` bit number outside 0..7.
    #[error("bit number must be 0..7")]
    BitNumber,

    /// An `rst` operand that is neither a vector number nor a vector
    /// address.
    #[error("invalid rst vector {0:#04x}")]
    RstVector(i32),

    /// An `im` operand outside 0..2.
    #[error("interrupt mode must be 0, 1 or 2")]
    InterruptMode,

    /// `assume ADL=…` with anything but 1.
    #[error("only ADL=1 is supported")]
    AdlMode,

    /// An `align` argument that is not a power of two.
    #[error("alignment must be a power of two")]
    Alignment,

    /// A byte-emitting statement inside BSS.
    #[error("cannot emit bytes into bss")]
    BssEmit,

    /// A negative `ds` count.
    #[error("count must not be negative")]
    NegativeCount,

    /// `include` nested past the depth bound.
    #[error("include depth limit exceeded")]
    IncludeDepth,

    /// A source, `include` or `incbin` file that would not open.
    #[error("cannot open `{path}`: {source}")]
    CannotOpen {
        /// The path as it appeared in the source or on the command line.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `xdef` on a name that never got a definition.
    #[error("exported symbol `{0}` is undefined")]
    ExportUndefined(String),

    /// The two passes disagreed on a section size.
    #[error("section sizes changed between passes")]
    PhaseError,
}
