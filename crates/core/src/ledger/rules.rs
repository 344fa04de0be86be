//! The ledger language's productions.

use crate::grammar::{n, t, Grammar, GrammarBuilder, GrammarError};
use crate::token::TokenKind::*;

/// What a reduction does. Several rules may share a tag when they differ
/// only in which alternative matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
    File,
    DeclarationsEmpty,
    DeclarationsDirective,
    DeclarationsEntry,
    DeclarationsError,
    /// Single-symbol alternatives that pass their value through.
    Forward,
    /// Line structure with no value: `empty_line`, `eol`, `directive`.
    Discard,

    TxnKeyword,
    TxnFlag,
    TxnAsterisk,

    Number,
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,
    UnaryPlus,
    Parens,

    FieldsEmpty,
    FieldString,
    FieldLink,
    FieldTag,
    FieldPipe,
    Transaction,

    OptFlagNone,
    OptFlagAsterisk,
    OptFlagFlag,
    PostingUnits,
    PostingPerUnitPrice,
    PostingTotalPrice,
    PostingBare,

    KeyValue,
    MetaString,
    MetaAccount,
    MetaDate,
    MetaCurrency,
    MetaTag,
    MetaBool,
    MetaNumber,
    MetaAmount,
    MetaEmpty,

    LinesEmpty,
    LinesKeyValue,
    LinesPosting,
    MetaListEmpty,
    MetaListAppend,
    CurrenciesEmpty,
    CurrenciesFirst,
    CurrenciesAppend,

    PushTag,
    PopTag,
    Open,
    BookingSome,
    BookingNone,
    Close,
    Commodity,
    Pad,
    Balance,

    Amount,
    AmountExact,
    AmountWithTolerance,
    MaybeNumberNone,
    MaybeNumberSome,
    CompoundPerUnit,
    CompoundWithTotal,
    Position,
    PositionWithLot,
    LotSpec,
    LotListEmpty,
    LotListFirst,
    LotListComma,
    LotListSlash,
    LotCost,
    LotDate,
    LotLabel,
    LotMerge,

    Price,
    Event,
    Note,
    Filename,
    Document,
    Option,
    Include,
    Plugin,
    PluginWithConfig,
}

impl Production {
    /// Posting rules read the enclosing transaction's flag from the stack.
    pub fn is_posting(self) -> bool {
        matches!(
            self,
            Production::PostingUnits
                | Production::PostingPerUnitPrice
                | Production::PostingTotalPrice
                | Production::PostingBare
        )
    }
}

pub fn ledger_grammar() -> Result<Grammar<Production>, GrammarError> {
    use Production as P;

    let mut g = GrammarBuilder::new();
    g.left(&[Plus, Minus])
        .left(&[Asterisk, Slash])
        .precedence(&[Negative]);

    let file = g.nonterminal("file");
    let declarations = g.nonterminal("declarations");
    let directive = g.nonterminal("directive");
    let entry = g.nonterminal("entry");
    let empty_line = g.nonterminal("empty_line");
    let eol = g.nonterminal("eol");
    let txn = g.nonterminal("txn");
    let number_expr = g.nonterminal("number_expr");
    let txn_fields = g.nonterminal("txn_fields");
    let transaction = g.nonterminal("transaction");
    let optflag = g.nonterminal("optflag");
    let posting = g.nonterminal("posting");
    let key_value = g.nonterminal("key_value");
    let key_value_value = g.nonterminal("key_value_value");
    let posting_or_kv_list = g.nonterminal("posting_or_kv_list");
    let key_value_list = g.nonterminal("key_value_list");
    let currency_list = g.nonterminal("currency_list");
    let pushtag = g.nonterminal("pushtag");
    let poptag = g.nonterminal("poptag");
    let open = g.nonterminal("open");
    let opt_booking = g.nonterminal("opt_booking");
    let close = g.nonterminal("close");
    let commodity = g.nonterminal("commodity");
    let pad = g.nonterminal("pad");
    let balance = g.nonterminal("balance");
    let amount = g.nonterminal("amount");
    let amount_tolerance = g.nonterminal("amount_tolerance");
    let maybe_number = g.nonterminal("maybe_number");
    let compound_amount = g.nonterminal("compound_amount");
    let position = g.nonterminal("position");
    let lot_spec = g.nonterminal("lot_spec");
    let lot_comp_list = g.nonterminal("lot_comp_list");
    let lot_comp = g.nonterminal("lot_comp");
    let price = g.nonterminal("price");
    let event = g.nonterminal("event");
    let note = g.nonterminal("note");
    let filename = g.nonterminal("filename");
    let document = g.nonterminal("document");
    let option = g.nonterminal("option");
    let include = g.nonterminal("include");
    let plugin = g.nonterminal("plugin");

    // Top level
    g.rule(file, &[n(declarations)], P::File)
        .rule(declarations, &[], P::DeclarationsEmpty)
        .rule(declarations, &[n(declarations), n(directive)], P::DeclarationsDirective)
        .rule(declarations, &[n(declarations), n(entry)], P::DeclarationsEntry)
        .rule(declarations, &[n(declarations), t(Error)], P::DeclarationsError);
    for sub in [empty_line, pushtag, poptag, option, include, plugin] {
        g.rule(directive, &[n(sub)], P::Discard);
    }
    for sub in [
        transaction, balance, open, close, pad, event, note, document, price, commodity,
    ] {
        g.rule(entry, &[n(sub)], P::Forward);
    }
    g.rule(empty_line, &[t(Eol)], P::Discard)
        .rule(empty_line, &[t(Comment), t(Eol)], P::Discard)
        .rule(empty_line, &[t(Skipped)], P::Discard)
        .rule(eol, &[t(Eol)], P::Discard)
        .rule(eol, &[t(Comment), t(Eol)], P::Discard);

    // Arithmetic
    let e = n(number_expr);
    g.rule(number_expr, &[t(Number)], P::Number)
        .rule(number_expr, &[e, t(Plus), e], P::Add)
        .rule(number_expr, &[e, t(Minus), e], P::Subtract)
        .rule(number_expr, &[e, t(Asterisk), e], P::Multiply)
        .rule(number_expr, &[e, t(Slash), e], P::Divide)
        .rule_prec(number_expr, &[t(Minus), e], P::Negate, Negative)
        .rule_prec(number_expr, &[t(Plus), e], P::UnaryPlus, Negative)
        .rule(number_expr, &[t(LParen), e, t(RParen)], P::Parens);

    // Transactions
    g.rule(txn, &[t(Txn)], P::TxnKeyword)
        .rule(txn, &[t(Flag)], P::TxnFlag)
        .rule(txn, &[t(Asterisk)], P::TxnAsterisk)
        .rule(txn_fields, &[], P::FieldsEmpty)
        .rule(txn_fields, &[n(txn_fields), t(Str)], P::FieldString)
        .rule(txn_fields, &[n(txn_fields), t(Link)], P::FieldLink)
        .rule(txn_fields, &[n(txn_fields), t(Tag)], P::FieldTag)
        .rule(txn_fields, &[n(txn_fields), t(Pipe)], P::FieldPipe)
        .rule(
            transaction,
            &[t(Date), n(txn), n(txn_fields), n(eol), n(posting_or_kv_list)],
            P::Transaction,
        )
        .rule(optflag, &[], P::OptFlagNone)
        .rule(optflag, &[t(Asterisk)], P::OptFlagAsterisk)
        .rule(optflag, &[t(Flag)], P::OptFlagFlag)
        .rule(
            posting,
            &[t(Indent), n(optflag), t(Account), n(position), n(eol)],
            P::PostingUnits,
        )
        .rule(
            posting,
            &[t(Indent), n(optflag), t(Account), n(position), t(At), n(amount), n(eol)],
            P::PostingPerUnitPrice,
        )
        .rule(
            posting,
            &[t(Indent), n(optflag), t(Account), n(position), t(AtAt), n(amount), n(eol)],
            P::PostingTotalPrice,
        )
        .rule(posting, &[t(Indent), n(optflag), t(Account), n(eol)], P::PostingBare);

    // Metadata
    g.rule(
        key_value,
        &[t(Indent), t(Key), n(key_value_value), n(eol)],
        P::KeyValue,
    )
    .rule(key_value_value, &[t(Str)], P::MetaString)
    .rule(key_value_value, &[t(Account)], P::MetaAccount)
    .rule(key_value_value, &[t(Date)], P::MetaDate)
    .rule(key_value_value, &[t(Currency)], P::MetaCurrency)
    .rule(key_value_value, &[t(Tag)], P::MetaTag)
    .rule(key_value_value, &[t(Bool)], P::MetaBool)
    .rule(key_value_value, &[n(number_expr)], P::MetaNumber)
    .rule(key_value_value, &[n(amount)], P::MetaAmount)
    .rule(key_value_value, &[], P::MetaEmpty)
    .rule(posting_or_kv_list, &[], P::LinesEmpty)
    .rule(
        posting_or_kv_list,
        &[n(posting_or_kv_list), n(key_value)],
        P::LinesKeyValue,
    )
    .rule(
        posting_or_kv_list,
        &[n(posting_or_kv_list), n(posting)],
        P::LinesPosting,
    )
    .rule(key_value_list, &[], P::MetaListEmpty)
    .rule(
        key_value_list,
        &[n(key_value_list), n(key_value)],
        P::MetaListAppend,
    );

    // Simple directives
    g.rule(currency_list, &[], P::CurrenciesEmpty)
        .rule(currency_list, &[t(Currency)], P::CurrenciesFirst)
        .rule(
            currency_list,
            &[n(currency_list), t(Comma), t(Currency)],
            P::CurrenciesAppend,
        )
        .rule(pushtag, &[t(PushTag), t(Tag), n(eol)], P::PushTag)
        .rule(poptag, &[t(PopTag), t(Tag), n(eol)], P::PopTag)
        .rule(
            open,
            &[
                t(Date),
                t(Open),
                t(Account),
                n(currency_list),
                n(opt_booking),
                n(eol),
                n(key_value_list),
            ],
            P::Open,
        )
        .rule(opt_booking, &[t(Str)], P::BookingSome)
        .rule(opt_booking, &[], P::BookingNone)
        .rule(
            close,
            &[t(Date), t(Close), t(Account), n(eol), n(key_value_list)],
            P::Close,
        )
        .rule(
            commodity,
            &[t(Date), t(Commodity), t(Currency), n(eol), n(key_value_list)],
            P::Commodity,
        )
        .rule(
            pad,
            &[t(Date), t(Pad), t(Account), t(Account), n(eol), n(key_value_list)],
            P::Pad,
        )
        .rule(
            balance,
            &[
                t(Date),
                t(Balance),
                t(Account),
                n(amount_tolerance),
                n(eol),
                n(key_value_list),
            ],
            P::Balance,
        );

    // Amounts and lots
    g.rule(amount, &[e, t(Currency)], P::Amount)
        .rule(amount_tolerance, &[e, t(Currency)], P::AmountExact)
        .rule(
            amount_tolerance,
            &[e, t(Tilde), e, t(Currency)],
            P::AmountWithTolerance,
        )
        .rule(maybe_number, &[], P::MaybeNumberNone)
        .rule(maybe_number, &[e], P::MaybeNumberSome)
        .rule(
            compound_amount,
            &[n(maybe_number), t(Currency)],
            P::CompoundPerUnit,
        )
        .rule(
            compound_amount,
            &[n(maybe_number), t(Hash), n(maybe_number), t(Currency)],
            P::CompoundWithTotal,
        )
        .rule(position, &[n(amount)], P::Position)
        .rule(position, &[n(amount), n(lot_spec)], P::PositionWithLot)
        .rule(lot_spec, &[t(LCurl), n(lot_comp_list), t(RCurl)], P::LotSpec)
        .rule(lot_comp_list, &[], P::LotListEmpty)
        .rule(lot_comp_list, &[n(lot_comp)], P::LotListFirst)
        .rule(
            lot_comp_list,
            &[n(lot_comp_list), t(Comma), n(lot_comp)],
            P::LotListComma,
        )
        .rule(
            lot_comp_list,
            &[n(lot_comp_list), t(Slash), n(lot_comp)],
            P::LotListSlash,
        )
        .rule(lot_comp, &[n(compound_amount)], P::LotCost)
        .rule(lot_comp, &[t(Date)], P::LotDate)
        .rule(lot_comp, &[t(Str)], P::LotLabel)
        .rule(lot_comp, &[t(Asterisk)], P::LotMerge);

    // Dated entries
    g.rule(
        price,
        &[t(Date), t(Price), t(Currency), n(amount), n(eol), n(key_value_list)],
        P::Price,
    )
    .rule(
        event,
        &[t(Date), t(Event), t(Str), t(Str), n(eol), n(key_value_list)],
        P::Event,
    )
    .rule(
        note,
        &[t(Date), t(Note), t(Account), t(Str), n(eol), n(key_value_list)],
        P::Note,
    )
    .rule(filename, &[t(Str)], P::Filename)
    .rule(
        document,
        &[t(Date), t(Document), t(Account), n(filename), n(eol), n(key_value_list)],
        P::Document,
    );

    // Options, includes, plugins
    g.rule(option, &[t(Option), t(Str), t(Str), n(eol)], P::Option)
        .rule(include, &[t(Include), t(Str), n(eol)], P::Include)
        .rule(plugin, &[t(Plugin), t(Str), n(eol)], P::Plugin)
        .rule(plugin, &[t(Plugin), t(Str), t(Str), n(eol)], P::PluginWithConfig);

    g.build(file)
}
