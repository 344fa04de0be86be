//! A Builder that renders every call as text.
//!
//! Handles carry their rendered form and a drop guard, so a test can ask
//! how many were created, how many were released and how many are still
//! alive after the parse returns.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tally_core::{
    Builder, Diagnostic, LotComponent, Meta, MetaValue, PostingParts, Provenance, TxnFields,
    TxnLine,
};

#[derive(Debug, Default)]
struct Tally {
    acquired: Cell<usize>,
    released: Cell<usize>,
}

/// A recorded value. Dropping it counts as one release.
#[derive(Debug)]
pub struct Handle {
    text: String,
    tally: Rc<Tally>,
}

impl Handle {
    fn new(text: String, tally: &Rc<Tally>) -> Self {
        tally.acquired.set(tally.acquired.get() + 1);
        Handle {
            text,
            tally: Rc::clone(tally),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.tally.released.set(self.tally.released.get() + 1);
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{op} rejected: {text}")]
pub struct RecordingError {
    pub op: &'static str,
    pub text: String,
}

/// One successful Builder call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    /// Line of the construct for operations that receive a provenance.
    pub line: Option<u32>,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct RecordingBuilder {
    tally: Rc<Tally>,
    calls: Vec<Call>,
    diagnostics: Vec<Diagnostic>,
    rejections: Vec<RecordingError>,
    fail_ops: Vec<&'static str>,
    fail_texts: Vec<String>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every call of operation `op`.
    pub fn fail_on(mut self, op: &'static str) -> Self {
        self.fail_ops.push(op);
        self
    }

    /// Rejects every call whose rendered text contains `needle`.
    pub fn fail_on_text(mut self, needle: impl Into<String>) -> Self {
        self.fail_texts.push(needle.into());
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Rendered calls, in order.
    pub fn log(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.text.as_str()).collect()
    }

    /// Rendered calls of operation `op`, in order.
    pub fn calls_of(&self, op: &str) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.text.as_str())
            .collect()
    }

    /// Rendered calls restricted to the given operations, in order.
    pub fn calls_among(&self, ops: &[&str]) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| ops.contains(&c.op))
            .map(|c| c.text.as_str())
            .collect()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn rejections(&self) -> &[RecordingError] {
        &self.rejections
    }

    pub fn acquired(&self) -> usize {
        self.tally.acquired.get()
    }

    pub fn released(&self) -> usize {
        self.tally.released.get()
    }

    /// Handles created and not yet dropped.
    pub fn live(&self) -> usize {
        self.acquired() - self.released()
    }

    fn check(&mut self, op: &'static str, text: &str) -> Result<(), RecordingError> {
        let fail = self.fail_ops.contains(&op)
            || self.fail_texts.iter().any(|needle| text.contains(needle.as_str()));
        if fail {
            let err = RecordingError {
                op,
                text: text.to_string(),
            };
            self.rejections.push(err.clone());
            return Err(err);
        }
        Ok(())
    }

    fn record(
        &mut self,
        op: &'static str,
        line: Option<u32>,
        text: String,
    ) -> Result<(), RecordingError> {
        self.check(op, &text)?;
        self.calls.push(Call { op, line, text });
        Ok(())
    }

    fn make(
        &mut self,
        op: &'static str,
        line: Option<u32>,
        text: String,
    ) -> Result<Handle, RecordingError> {
        self.record(op, line, text.clone())?;
        Ok(Handle::new(text, &self.tally))
    }

    /// A value-producing call whose result renders as `value` and whose log
    /// entry is `op(value)`.
    fn value(&mut self, op: &'static str, value: String) -> Result<Handle, RecordingError> {
        self.check(op, &value)?;
        self.calls.push(Call {
            op,
            line: None,
            text: format!("{op}({value})"),
        });
        Ok(Handle::new(value, &self.tally))
    }
}

// ──── Rendering ────

fn opt(handle: &Option<Handle>) -> String {
    handle
        .as_ref()
        .map_or_else(|| "none".to_string(), |h| h.text.clone())
}

fn meta(meta: &Meta<Handle>) -> String {
    match meta {
        None => "none".to_string(),
        Some(items) => format!("[{}]", join(items.iter().map(|h| h.text.as_str()))),
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

fn joined(items: &[String]) -> String {
    join(items.iter().map(String::as_str))
}

fn component(c: &LotComponent<Handle>) -> String {
    match c {
        LotComponent::Cost(h) => h.text.clone(),
        LotComponent::Date(d) => d.clone(),
        LotComponent::Label(l) => format!("{l:?}"),
        LotComponent::Merge => "*".to_string(),
    }
}

fn meta_value(value: &MetaValue<Handle>) -> String {
    match value {
        MetaValue::Str(s) => format!("{s:?}"),
        MetaValue::Account(s) | MetaValue::Date(s) | MetaValue::Currency(s) => s.clone(),
        MetaValue::Tag(t) => format!("#{t}"),
        MetaValue::Bool(b) => b.to_string(),
        MetaValue::Number(h) | MetaValue::Amount(h) => h.text.clone(),
        MetaValue::Empty => "none".to_string(),
    }
}

fn flag(flag: Option<char>) -> String {
    flag.map_or_else(|| "none".to_string(), String::from)
}

impl Builder for RecordingBuilder {
    type Handle = Handle;
    type Error = RecordingError;
    type Output = Vec<String>;

    fn number(&mut self, text: &str) -> Result<Handle, RecordingError> {
        self.value("number", text.to_string())
    }

    fn add(&mut self, lhs: Handle, rhs: Handle) -> Result<Handle, RecordingError> {
        self.value("add", format!("({lhs} + {rhs})"))
    }

    fn subtract(&mut self, lhs: Handle, rhs: Handle) -> Result<Handle, RecordingError> {
        self.value("subtract", format!("({lhs} - {rhs})"))
    }

    fn multiply(&mut self, lhs: Handle, rhs: Handle) -> Result<Handle, RecordingError> {
        self.value("multiply", format!("({lhs} * {rhs})"))
    }

    fn divide(&mut self, lhs: Handle, rhs: Handle) -> Result<Handle, RecordingError> {
        self.value("divide", format!("({lhs} / {rhs})"))
    }

    fn negate(&mut self, value: Handle) -> Result<Handle, RecordingError> {
        self.value("negate", format!("(-{value})"))
    }

    fn amount(&mut self, number: Handle, currency: &str) -> Result<Handle, RecordingError> {
        self.value("amount", format!("{number} {currency}"))
    }

    fn compound_amount(
        &mut self,
        per_unit: Option<Handle>,
        total: Option<Handle>,
        currency: &str,
    ) -> Result<Handle, RecordingError> {
        self.value(
            "compound_amount",
            format!("{} # {} {currency}", opt(&per_unit), opt(&total)),
        )
    }

    fn lot_spec(&mut self, components: Vec<LotComponent<Handle>>) -> Result<Handle, RecordingError> {
        let parts: Vec<String> = components.iter().map(component).collect();
        self.value("lot_spec", format!("{{{}}}", joined(&parts)))
    }

    fn position(
        &mut self,
        prov: &Provenance,
        units: Handle,
        lot: Option<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = match &lot {
            Some(lot) => format!("{units} {lot}"),
            None => units.text.clone(),
        };
        self.check("position", &text)?;
        self.calls.push(Call {
            op: "position",
            line: Some(prov.line),
            text: format!("position({text})"),
        });
        Ok(Handle::new(text, &self.tally))
    }

    fn key_value(&mut self, key: &str, value: MetaValue<Handle>) -> Result<Handle, RecordingError> {
        self.value("key_value", format!("{key}: {}", meta_value(&value)))
    }

    fn posting(
        &mut self,
        prov: &Provenance,
        parts: PostingParts<Handle>,
    ) -> Result<Handle, RecordingError> {
        let price = match (&parts.price, parts.total_price) {
            (Some(p), true) => format!("@@ {p}"),
            (Some(p), false) => format!("@ {p}"),
            (None, _) => "none".to_string(),
        };
        let text = format!(
            "posting({}, {}, {price}, flag={}, txn={})",
            parts.account,
            opt(&parts.position),
            flag(parts.flag),
            parts.txn_flag
        );
        self.make("posting", Some(prov.line), text)
    }

    fn transaction(
        &mut self,
        prov: &Provenance,
        date: &str,
        flag: char,
        fields: TxnFields,
        lines: Vec<TxnLine<Handle>>,
    ) -> Result<Handle, RecordingError> {
        let strings: Vec<String> = fields.strings.iter().map(|s| format!("{s:?}")).collect();
        let lines: Vec<String> = lines
            .iter()
            .map(|line| match line {
                TxnLine::Posting(h) => h.text.clone(),
                TxnLine::Meta(h) => format!("meta({h})"),
            })
            .collect();
        let text = format!(
            "transaction({date}, {flag}, [{}], tags=[{}], links=[{}], [{}])",
            joined(&strings),
            joined(&fields.tags),
            joined(&fields.links),
            lines.join("; ")
        );
        self.make("transaction", Some(prov.line), text)
    }

    fn open(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        currencies: Vec<String>,
        booking: Option<String>,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let booking = booking.map_or_else(|| "none".to_string(), |b| format!("{b:?}"));
        let text = format!(
            "open({date}, {account}, [{}], booking={booking}, meta={})",
            joined(&currencies),
            meta(&meta_list)
        );
        self.make("open", Some(prov.line), text)
    }

    fn close(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!("close({date}, {account}, meta={})", meta(&meta_list));
        self.make("close", Some(prov.line), text)
    }

    fn commodity(
        &mut self,
        prov: &Provenance,
        date: &str,
        currency: &str,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!("commodity({date}, {currency}, meta={})", meta(&meta_list));
        self.make("commodity", Some(prov.line), text)
    }

    fn pad(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        source_account: &str,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!(
            "pad({date}, {account}, {source_account}, meta={})",
            meta(&meta_list)
        );
        self.make("pad", Some(prov.line), text)
    }

    fn balance(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        amount: Handle,
        tolerance: Option<Handle>,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!(
            "balance({date}, {account}, {amount}, tolerance={}, meta={})",
            opt(&tolerance),
            meta(&meta_list)
        );
        self.make("balance", Some(prov.line), text)
    }

    fn price(
        &mut self,
        prov: &Provenance,
        date: &str,
        currency: &str,
        amount: Handle,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!("price({date}, {currency}, {amount}, meta={})", meta(&meta_list));
        self.make("price", Some(prov.line), text)
    }

    fn event(
        &mut self,
        prov: &Provenance,
        date: &str,
        kind: &str,
        description: &str,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!(
            "event({date}, {kind:?}, {description:?}, meta={})",
            meta(&meta_list)
        );
        self.make("event", Some(prov.line), text)
    }

    fn note(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        comment: &str,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!("note({date}, {account}, {comment:?}, meta={})", meta(&meta_list));
        self.make("note", Some(prov.line), text)
    }

    fn document(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        filename: &str,
        meta_list: Meta<Handle>,
    ) -> Result<Handle, RecordingError> {
        let text = format!(
            "document({date}, {account}, {filename:?}, meta={})",
            meta(&meta_list)
        );
        self.make("document", Some(prov.line), text)
    }

    fn option(&mut self, prov: &Provenance, key: &str, value: &str) -> Result<(), RecordingError> {
        self.record("option", Some(prov.line), format!("option({key:?}, {value:?})"))
    }

    fn include(&mut self, prov: &Provenance, filename: &str) -> Result<(), RecordingError> {
        self.record("include", Some(prov.line), format!("include({filename:?})"))
    }

    fn plugin(
        &mut self,
        prov: &Provenance,
        name: &str,
        config: Option<&str>,
    ) -> Result<(), RecordingError> {
        let config = config.map_or_else(|| "none".to_string(), |c| format!("{c:?}"));
        self.record(
            "plugin",
            Some(prov.line),
            format!("plugin({name:?}, config={config})"),
        )
    }

    fn pushtag(&mut self, tag: &str) -> Result<(), RecordingError> {
        self.record("pushtag", None, format!("pushtag({tag})"))
    }

    fn poptag(&mut self, tag: &str) -> Result<(), RecordingError> {
        self.record("poptag", None, format!("poptag({tag})"))
    }

    fn report_error(&mut self, diagnostic: &Diagnostic) {
        self.calls.push(Call {
            op: "report_error",
            line: Some(diagnostic.line),
            text: format!("report_error({diagnostic})"),
        });
        self.diagnostics.push(diagnostic.clone());
    }

    fn finalize(&mut self, entries: Vec<Handle>) -> Vec<String> {
        self.calls.push(Call {
            op: "finalize",
            line: None,
            text: format!("finalize({})", entries.len()),
        });
        entries.iter().map(|h| h.text.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prov() -> Provenance {
        Provenance {
            file: "t".into(),
            line: 1,
        }
    }

    #[test]
    fn handles_count_their_release() {
        let mut b = RecordingBuilder::new();
        let two = b.number("2").unwrap();
        let three = b.number("3").unwrap();
        assert_eq!(b.live(), 2);
        let sum = b.add(two, three).unwrap();
        assert_eq!(sum.text(), "(2 + 3)");
        assert_eq!(b.acquired(), 3);
        assert_eq!(b.live(), 1);
        drop(sum);
        assert_eq!(b.live(), 0);
        assert_eq!(b.log(), vec!["number(2)", "number(3)", "add((2 + 3))"]);
    }

    #[test]
    fn failure_injection_by_op_releases_inputs() {
        let mut b = RecordingBuilder::new().fail_on("amount");
        let n = b.number("1").unwrap();
        let err = b.amount(n, "USD").unwrap_err();
        assert_eq!(err.to_string(), "amount rejected: 1 USD");
        assert_eq!(b.live(), 0);
        assert_eq!(b.calls_of("amount"), Vec::<&str>::new());
        assert_eq!(b.rejections().len(), 1);
    }

    #[test]
    fn failure_injection_by_text() {
        let mut b = RecordingBuilder::new().fail_on_text("Assets:Bad");
        assert!(b.close(&prov(), "2023-01-01", "Assets:Good", None).is_ok());
        assert!(b.close(&prov(), "2023-01-01", "Assets:Bad", None).is_err());
        assert_eq!(
            b.calls_of("close"),
            vec!["close(2023-01-01, Assets:Good, meta=none)"]
        );
    }

    #[test]
    fn open_renders_optional_parts() {
        let mut b = RecordingBuilder::new();
        let h = b
            .open(&prov(), "2023-01-01", "Assets:Cash", vec!["USD".into()], None, None)
            .unwrap();
        assert_eq!(
            h.text(),
            "open(2023-01-01, Assets:Cash, [USD], booking=none, meta=none)"
        );
        assert_eq!(b.calls()[0].line, Some(1));
    }
}
