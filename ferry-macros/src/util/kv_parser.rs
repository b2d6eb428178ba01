/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;

use proc_macro2::{Ident, Span, TokenTree};

use super::{bail, error, ident, is_punct, path_is_single};
use crate::ParseResult;

pub(crate) type KvMap = HashMap<Ident, Option<KvValue>>;

/// Parses attributes like `#[attr(key, key2 = value, key3 = 123)]`.
///
/// Keys are consumed with [`handle_ident()`](Self::handle_ident); [`finish()`](Self::finish) reports the ones nobody asked for.
pub(crate) struct KvParser {
    map: KvMap,
    span: Span,
}

impl KvParser {
    /// Parses the `#[expected]` attribute, or returns `Ok(None)` if it is absent.
    pub fn parse(attributes: &[venial::Attribute], expected: &str) -> ParseResult<Option<Self>> {
        let mut found_attr: Option<Self> = None;

        for attr in attributes.iter() {
            if !path_is_single(&attr.path, expected) {
                continue;
            }

            if found_attr.is_some() {
                return bail!(attr, "only a single #[{expected}] attribute allowed");
            }

            found_attr = Some(Self {
                span: attr.tk_brackets.span,
                map: ParserState::parse(expected, &attr.value)?,
            });
        }

        Ok(found_attr)
    }

    /// Like [`parse()`](Self::parse), but also removes the attribute from `attributes`.
    ///
    /// Inner attributes of a `#[proc_macro_attribute]` item must not remain in the emitted code, since the compiler does not know them.
    pub fn parse_remove(attributes: &mut Vec<venial::Attribute>, expected: &str) -> ParseResult<Option<Self>> {
        let parsed = Self::parse(attributes, expected)?;
        if parsed.is_some() {
            attributes.retain(|attr| !path_is_single(&attr.path, expected));
        }

        Ok(parsed)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Handles an optional key that can only occur with an identifier as the value.
    pub fn handle_ident(&mut self, key: &str) -> ParseResult<Option<Ident>> {
        match self.map.remove_entry(&ident(key)) {
            None => Ok(None),
            // The removed key carries the span of the user's token.
            Some((key, None)) => bail!(key, "expected `{key}` to be followed by `= identifier`"),
            Some((_, Some(value))) => Ok(Some(value.ident()?)),
        }
    }

    /// Checks that all keys have been consumed.
    ///
    /// Explicit instead of `Drop`, because callers returning an error early would drop a half-consumed parser.
    pub fn finish(self) -> ParseResult<()> {
        let errors = self.map.keys().map(|key| error!(key, "unrecognized key `{key}`"));

        match errors.reduce(|mut a, b| {
            a.combine(b);
            a
        }) {
            None => Ok(()),
            Some(combined) => Err(combined),
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub(crate) struct KvValue {
    /// Tokens comprising this value. Never empty.
    tokens: Vec<TokenTree>,
}

impl KvValue {
    fn new(tokens: Vec<TokenTree>) -> Self {
        assert!(!tokens.is_empty());
        Self { tokens }
    }

    pub fn ident(mut self) -> ParseResult<Ident> {
        if self.tokens.len() > 1 {
            return bail!(&self.tokens[1], "expected a single identifier, not an expression");
        }

        match self.tokens.remove(0) {
            TokenTree::Ident(ident) => Ok(ident),
            tt => bail!(tt, "expected identifier"),
        }
    }
}

struct ParserState<'a> {
    attr_name: &'a str,
    tokens: std::slice::Iter<'a, TokenTree>,
    prev: Option<&'a TokenTree>,
    cur: Option<&'a TokenTree>,
}

impl<'a> ParserState<'a> {
    fn parse(attr_name: &'a str, attr_value: &'a venial::AttributeValue) -> ParseResult<KvMap> {
        let mut tokens = match attr_value {
            venial::AttributeValue::Equals(punct, _tokens) => {
                return bail!(punct, "expected `(` or `]`");
            }
            _ => attr_value.get_value_tokens().iter(),
        };
        let cur = tokens.next();

        let parser = Self {
            attr_name,
            tokens,
            prev: None,
            cur,
        };

        parser.parse_map()
    }

    fn parse_map(mut self) -> ParseResult<KvMap> {
        let mut map: KvMap = HashMap::new();

        // Whether the previous value spans several tokens. Only used for hints in error messages.
        let mut prev_expr_complex = false;

        while let Some(cur) = self.cur {
            let TokenTree::Ident(key) = cur else {
                let hint = self.parens_hint(prev_expr_complex, "the preceding `,`");
                return bail!(cur, "expected identifier{hint}");
            };

            self.next();
            let value = self.parse_opt_value(key, prev_expr_complex)?;
            if map.contains_key(key) {
                return bail!(key, "duplicate key `{key}`");
            }

            prev_expr_complex = value.as_ref().is_some_and(|value| value.tokens.len() > 1);
            map.insert(key.clone(), value);
        }

        Ok(map)
    }

    fn parse_opt_value(&mut self, key: &Ident, prev_expr_complex: bool) -> ParseResult<Option<KvValue>> {
        match self.cur {
            // End of input directly after a key.
            None => Ok(None),

            Some(tt) if is_punct(tt, ',') => {
                self.next();
                Ok(None)
            }

            Some(tt) if is_punct(tt, '=') => {
                self.next();
                self.parse_value().map(Some)
            }

            Some(tt) => {
                let hint = self.parens_hint(prev_expr_complex, &format!("`{key}`"));
                bail!(tt, "expected next argument, or `= value` following `{key}`{hint}")
            }
        }
    }

    fn parse_value(&mut self) -> ParseResult<KvValue> {
        let mut tokens = Vec::new();
        while let Some(cur) = self.cur {
            self.next();
            if is_punct(cur, ',') {
                break;
            }
            tokens.push(cur.clone());
        }

        if tokens.is_empty() {
            // `cur` may be `None` here; point at the `=` or the `,` directly after it.
            return match self.prev {
                Some(prev) => bail!(prev, "expected value after `=`"),
                None => bail!(Span::call_site(), "expected value after `=`"),
            };
        }

        Ok(KvValue::new(tokens))
    }

    fn parens_hint(&self, prev_expr_complex: bool, what: &str) -> String {
        if prev_expr_complex {
            let attr = self.attr_name;
            format!(
                "\nnote: {what} is interpreted as the next argument to `#[{attr}]`; \
                if it belongs to the previous expression, surround that expression with parentheses"
            )
        } else {
            String::new()
        }
    }

    fn next(&mut self) {
        self.prev = self.cur;
        self.cur = self.tokens.next();
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::TokenStream;
    use quote::quote;

    fn attributes(input_tokens: TokenStream) -> Vec<venial::Attribute> {
        let input = quote! {
            #input_tokens
            fn func();
        };

        let item = venial::parse_item(input).expect("item");
        item.as_function().expect("fn").attributes.clone()
    }

    fn parse(input_tokens: TokenStream) -> KvMap {
        let attrs = attributes(input_tokens);
        assert_eq!(attrs.len(), 1);

        ParserState::parse("attr", &attrs[0].value).expect("parse")
    }

    // Compares token by token through the string form; spans are ignored.
    fn expect_parsed(input_tokens: TokenStream, expected: Vec<(&str, Option<TokenStream>)>) {
        let mut parsed = parse(input_tokens);

        for (key, value) in expected {
            let actual = parsed.remove(&ident(key)).unwrap_or_else(|| panic!("missing key `{key}`"));
            let actual = actual.map(|kv| kv.tokens.into_iter().collect::<TokenStream>().to_string());

            assert_eq!(actual, value.map(|ts| ts.to_string()), "incorrect parsed value for `{key}`");
        }

        assert!(parsed.is_empty(), "remaining entries in map: {parsed:?}");
    }

    #[test]
    fn parse_keys_and_values() {
        expect_parsed(
            quote! { #[attr(alone, rename = _ready, last)] },
            vec![("alone", None), ("rename", Some(quote! { _ready })), ("last", None)],
        );
    }

    #[test]
    fn parse_trailing_comma() {
        expect_parsed(
            quote! { #[attr(entry_symbol = demo_init,)] },
            vec![("entry_symbol", Some(quote! { demo_init }))],
        );
    }

    #[test]
    fn parse_exprs() {
        expect_parsed(
            quote! {
                #[attr(
                    neg = -42,
                    sum = 1 + 1,
                    call = Vector2::new(1.0, -1.0e2),
                    generic = (HashMap::<String, Vec<usize>>::new()),
                )]
            },
            vec![
                ("neg", Some(quote! { -42 })),
                ("sum", Some(quote! { 1 + 1 })),
                ("call", Some(quote! { Vector2::new(1.0, -1.0e2) })),
                ("generic", Some(quote! { (HashMap::<String, Vec<usize>>::new()) })),
            ],
        );
    }

    #[test]
    fn parse_rejects_duplicates_and_missing_values() {
        let attrs = attributes(quote! { #[attr(key, key)] });
        assert!(ParserState::parse("attr", &attrs[0].value).is_err());

        let attrs = attributes(quote! { #[attr(key = )] });
        assert!(ParserState::parse("attr", &attrs[0].value).is_err());
    }

    #[test]
    fn handle_and_finish() {
        let attrs = attributes(quote! { #[func(rename = _process, extra)] });
        let mut parser = KvParser::parse(&attrs, "func").expect("parse").expect("present");

        let rename = parser.handle_ident("rename").expect("ident");
        assert_eq!(rename.map(|id| id.to_string()).as_deref(), Some("_process"));
        assert!(parser.finish().is_err());
    }

    #[test]
    fn parse_remove_strips_attribute() {
        let mut attrs = attributes(quote! {
            #[inline]
            #[func]
        });

        let parser = KvParser::parse_remove(&mut attrs, "func").expect("parse");
        assert!(parser.is_some());
        assert_eq!(attrs.len(), 1);
        assert!(KvParser::parse(&attrs, "func").expect("parse").is_none());
    }
}
