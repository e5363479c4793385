#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use orm_expr::render::canonical::{literal, quote};
    use orm_expr::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn path(text: &str) -> Node {
        Node::path(text).unwrap()
    }

    fn portable(node: &Node) -> (String, Vec<Value>) {
        let mut parameters = Vec::new();
        let text = node.to_portable(&mut parameters, "a").unwrap();
        (text, parameters)
    }

    fn painting_subquery(qualifier: Option<Node>) -> Node {
        Node::subquery(
            SubqueryTarget {
                entity: "Painting".to_string(),
                select: None,
            },
            qualifier,
        )
        .unwrap()
    }

    // ========================================================================
    // Canonical form: literals
    // ========================================================================

    #[test]
    fn test_canonical_literals() {
        assert_eq!(literal(&Value::Null), "null");
        assert_eq!(literal(&Value::Boolean(true)), "true");
        assert_eq!(literal(&Value::Long(-42)), "-42");
        assert_eq!(literal(&Value::Double(2.0)), "2.0");
        assert_eq!(literal(&Value::Double(2.5)), "2.5");
        assert_eq!(literal(&Value::Decimal(Decimal::from_str("10.50").unwrap())), "10.50");
        assert_eq!(literal(&Value::from("it's")), "\"it's\"");
        assert_eq!(literal(&Value::Bytes(vec![0xCA, 0xFE])), "x'CAFE'");
        assert_eq!(
            literal(&Value::Enum(EnumValue::new("Status", "SOLD", 1))),
            "enum:Status.SOLD"
        );
        assert_eq!(
            literal(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())),
            "\"2024-01-31\""
        );
        assert_eq!(literal(&Value::list([1, 2])), "(1, 2)");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("line\nbreak\ttab"), "\"line\\nbreak\\ttab\"");
        assert_eq!(quote("\u{1}"), "\"\\u0001\"");
    }

    // ========================================================================
    // Canonical form: structure
    // ========================================================================

    #[test]
    fn test_canonical_leaves() {
        assert_eq!(Node::param("name").to_string(), "$name");
        assert_eq!(Node::db_path("ARTIST_ID").unwrap().to_string(), "db:ARTIST_ID");
        assert_eq!(Node::dbid_path("ARTIST_ID").unwrap().to_string(), "dbid:ARTIST_ID");
        assert_eq!(path("paintings+#p.paintingTitle").to_string(), "paintings+#p.paintingTitle");
        assert_eq!(Node::leaf(NodeKind::CurrentDate).to_string(), "currentDate()");
    }

    #[test]
    fn test_canonical_nested_conditions() {
        let node = Node::or([
            Node::and([
                Node::greater_than(path("estimatedPrice"), 5000).unwrap(),
                Node::like(path("toArtist.artistName"), "Pablo%").unwrap(),
            ])
            .unwrap(),
            Node::not(Node::in_list(path("paintingTitle"), vec![Value::from("a"), Value::from("b")]).unwrap())
                .unwrap(),
        ])
        .unwrap();

        assert_eq!(
            node.to_string(),
            "((estimatedPrice > 5000) and (toArtist.artistName like \"Pablo%\")) or (not (paintingTitle in (\"a\", \"b\")))"
        );
    }

    #[test]
    fn test_canonical_between_and_like_escape() {
        let between = Node::between(path("x"), 1, 10).unwrap();
        assert_eq!(between.to_string(), "x between 1 and 10");

        let like = Node::like_ignore_case(path("x"), "a!%%").unwrap().with_escape('!').unwrap();
        assert_eq!(like.to_string(), "x likeIgnoreCase \"a!%%\" escape '!'");

        let wrapped = Node::and([between, like]).unwrap();
        assert_eq!(
            wrapped.to_string(),
            "(x between 1 and 10) and (x likeIgnoreCase \"a!%%\" escape '!')"
        );
    }

    #[test]
    fn test_canonical_functions_are_not_wrapped() {
        let node = Node::equal(
            Node::function(NodeKind::Upper, [path("name")]).unwrap(),
            Node::function(NodeKind::Concat, [Node::scalar("A"), path("suffix")]).unwrap(),
        )
        .unwrap();
        assert_eq!(node.to_string(), "upper(name) = concat(\"A\", suffix)");

        let year = Node::function(NodeKind::Extract(DatePart::DayOfWeek), [path("d")]).unwrap();
        assert_eq!(year.to_string(), "dayOfWeek(d)");
    }

    #[test]
    fn test_canonical_arithmetic_and_bitwise() {
        let node = Node::multiply(Node::add(path("a"), 1).unwrap(), Node::negate(path("b")).unwrap()).unwrap();
        assert_eq!(node.to_string(), "(a + 1) * (-b)");

        let shift = Node::new(NodeKind::BitwiseLeftShift, [path("flags"), Node::scalar(2)]).unwrap();
        assert_eq!(shift.to_string(), "flags << 2");
    }

    #[test]
    fn test_canonical_negative_literals_are_delimited() {
        assert_eq!(Node::negate(-5).unwrap().to_string(), "-(-5)");
        assert_eq!(Node::subtract(path("a"), -5).unwrap().to_string(), "a - (-5)");
        assert_eq!(Node::equal(path("a"), -2.5).unwrap().to_string(), "a = (-2.5)");
        assert_eq!(Node::scalar(-5).to_string(), "-5");
        assert_eq!(
            Node::function(NodeKind::Abs, [Node::scalar(-5)]).unwrap().to_string(),
            "abs(-5)"
        );
    }

    #[test]
    fn test_canonical_escapes_case_and_subquery() {
        let call = Node::new(NodeKind::FunctionCall("soundex".into()), [path("name")]).unwrap();
        assert_eq!(call.to_string(), "fn(\"soundex\", name)");

        let agg = Node::new(NodeKind::CustomAggregate("median".into()), [path("price")]).unwrap();
        assert_eq!(agg.to_string(), "agg(\"median\", price)");

        let case = Node::case_when(
            [(Node::greater_than(path("n"), 1).unwrap(), Node::scalar("big"))],
            Some(Node::scalar("small")),
        )
        .unwrap();
        assert_eq!(case.to_string(), "case when n > 1 then \"big\" else \"small\" end");

        let exists = Node::exists(painting_subquery(Some(
            Node::equal(path("toArtist.artistName"), "Dali").unwrap(),
        )))
        .unwrap();
        assert_eq!(
            exists.to_string(),
            "exists subquery(\"Painting\", toArtist.artistName = \"Dali\")"
        );

        let enclosing = Node::enclosing(path("toArtist")).unwrap();
        assert_eq!(enclosing.to_string(), "$.toArtist");
    }

    // ========================================================================
    // Portable form
    // ========================================================================

    #[test]
    fn test_portable_literals_become_parameters() {
        let node = Node::and([
            Node::greater_than(path("estimatedPrice"), 5000).unwrap(),
            Node::equal(path("toArtist.artistName"), "Picasso").unwrap(),
        ])
        .unwrap();

        let (text, parameters) = portable(&node);
        assert_eq!(text, "(a.estimatedPrice > ?1) and (a.toArtist.artistName = ?2)");
        assert_eq!(parameters, vec![Value::Int(5000), Value::from("Picasso")]);
    }

    #[test]
    fn test_portable_numbering_continues_existing_list() {
        let mut parameters = vec![Value::from("already")];
        let text = Node::equal(path("x"), 1)
            .unwrap()
            .to_portable(&mut parameters, "t")
            .unwrap();
        assert_eq!(text, "t.x = ?2");
        assert_eq!(parameters.len(), 2);
    }

    #[test]
    fn test_portable_null_comparisons() {
        let (text, parameters) = portable(&Node::equal(path("x"), Value::Null).unwrap());
        assert_eq!(text, "a.x is null");
        assert!(parameters.is_empty());

        let (text, _) = portable(&Node::not_equal(path("x"), Value::Null).unwrap());
        assert_eq!(text, "a.x is not null");

        let (text, _) = portable(&Node::not_equal(path("x"), 3).unwrap());
        assert_eq!(text, "a.x <> ?1");
    }

    #[test]
    fn test_portable_in_between_like() {
        let (text, parameters) =
            portable(&Node::in_list(path("id"), vec![Value::from(1), Value::from(2)]).unwrap());
        assert_eq!(text, "a.id in (?1, ?2)");
        assert_eq!(parameters.len(), 2);

        let (text, _) = portable(&Node::not_between(path("n"), 1, 5).unwrap());
        assert_eq!(text, "a.n not between ?1 and ?2");

        let (text, parameters) = portable(&Node::not_like_ignore_case(path("name"), "pic%").unwrap());
        assert_eq!(text, "upper(a.name) not like upper(?1)");
        assert_eq!(parameters, vec![Value::from("pic%")]);

        let like = Node::like(path("code"), "A!_%").unwrap().with_escape('!').unwrap();
        let (text, _) = portable(&like);
        assert_eq!(text, "a.code like ?1 escape '!'");
    }

    #[test]
    fn test_portable_rejects_quote_escape() {
        let like = Node::like(path("code"), "x%").unwrap().with_escape('\'').unwrap();
        let mut parameters = Vec::new();
        assert!(matches!(
            like.to_portable(&mut parameters, "a"),
            Err(ExpressionError::IllegalEscape { escape: '\'', .. })
        ));
    }

    #[test]
    fn test_portable_paths_resolve_aliases_and_drop_outer_markers() {
        let (text, _) = portable(&Node::equal(path("paintings+#p.paintingTitle"), "x").unwrap());
        assert_eq!(text, "a.paintings.paintingTitle = ?1");

        let (text, _) = portable(&Node::equal(Node::db_path("ARTIST_ID").unwrap(), 1).unwrap());
        assert_eq!(text, "db:a.ARTIST_ID = ?1");
    }

    #[test]
    fn test_portable_functions_and_aggregates() {
        let node = Node::greater_than(
            Node::function(NodeKind::Length, [Node::function(NodeKind::Trim, [path("name")]).unwrap()]).unwrap(),
            3,
        )
        .unwrap();
        let (text, _) = portable(&node);
        assert_eq!(text, "length(trim(a.name)) > ?1");

        let (text, _) = portable(&Node::count_all());
        assert_eq!(text, "count(a)");

        let (text, _) = portable(&Node::function(NodeKind::Distinct, [path("name")]).unwrap());
        assert_eq!(text, "distinct a.name");

        let call = Node::new(NodeKind::FunctionCall("soundex".into()), [path("name")]).unwrap();
        let (text, _) = portable(&call);
        assert_eq!(text, "function('soundex', a.name)");

        let (text, _) = portable(&Node::leaf(NodeKind::CurrentTimestamp));
        assert_eq!(text, "current_timestamp");
    }

    #[test]
    fn test_portable_subquery_with_enclosing_reference() {
        let qualifier = Node::equal(
            path("toArtist"),
            Node::enclosing(Node::path("").unwrap()).unwrap(),
        )
        .unwrap();
        let node = Node::exists(painting_subquery(Some(qualifier))).unwrap();

        let (text, parameters) = portable(&node);
        assert_eq!(text, "exists (select a1 from Painting a1 where a1.toArtist = a)");
        assert!(parameters.is_empty());
    }

    #[test]
    fn test_portable_quantified_subquery() {
        let subquery = Node::subquery(
            SubqueryTarget {
                entity: "Painting".to_string(),
                select: Some(Path::parse("estimatedPrice").unwrap()),
            },
            None,
        )
        .unwrap();
        let node = Node::greater_than(path("estimatedPrice"), Node::all(subquery).unwrap()).unwrap();

        let (text, _) = portable(&node);
        assert_eq!(text, "a.estimatedPrice > all (select a1.estimatedPrice from Painting a1)");
    }

    #[test]
    fn test_portable_unsupported_kinds() {
        let case = Node::case_when([(Node::true_node(), Node::scalar(1))], None).unwrap();
        let mut parameters = Vec::new();
        assert!(matches!(
            case.to_portable(&mut parameters, "a"),
            Err(ExpressionError::UnsupportedRender { kind: "CASE_WHEN", form: "portable" })
        ));

        let bitwise = Node::new(NodeKind::BitwiseAnd, [path("flags"), Node::scalar(1)]).unwrap();
        assert!(bitwise.to_portable(&mut parameters, "a").is_err());

        let year = Node::function(NodeKind::Extract(DatePart::Year), [path("d")]).unwrap();
        assert!(year.to_portable(&mut parameters, "a").is_err());
    }

    // ========================================================================
    // Shallow copy
    // ========================================================================

    fn both_forms(node: &Node) -> (String, Option<(String, Vec<Value>)>) {
        let mut parameters = Vec::new();
        let portable = node.to_portable(&mut parameters, "a").ok().map(|text| (text, parameters));
        (node.to_string(), portable)
    }

    /// Shallow-copies every node of the tree, re-attaches its operands and
    /// compares both renderings with the original's
    fn assert_reattached_copies_render_alike(node: &Node) {
        let mut copy = node.shallow_copy();
        for operand in node.operands() {
            copy.push_operand(operand.clone()).unwrap();
        }
        assert_eq!(both_forms(&copy), both_forms(node), "copy of {}", node.kind().name());

        for operand in node.operands() {
            assert_reattached_copies_render_alike(operand);
        }
    }

    #[test]
    fn test_shallow_copy_renders_alike_for_every_kind() {
        let x = || path("x");
        let call = |kind: NodeKind, args: Vec<Node>| Node::new(kind, args).unwrap();

        let trees = vec![
            Node::and([
                Node::equal(x(), Node::param("p")).unwrap(),
                Node::not(Node::like(x(), "a!%%").unwrap().with_escape('!').unwrap()).unwrap(),
                Node::or([
                    Node::not_equal(Node::db_path("X_ID").unwrap(), Value::Null).unwrap(),
                    Node::less_than(Node::dbid_path("X_ID").unwrap(), 1.5).unwrap(),
                ])
                .unwrap(),
            ])
            .unwrap(),
            Node::and([
                Node::less_or_equal(Node::add(x(), 1).unwrap(), Node::multiply(x(), 2).unwrap()).unwrap(),
                Node::greater_or_equal(
                    Node::subtract(x(), 1).unwrap(),
                    Node::divide(x(), Node::negate(x()).unwrap()).unwrap(),
                )
                .unwrap(),
            ])
            .unwrap(),
            Node::or([
                Node::between(x(), 1, 5).unwrap(),
                Node::not_between(x(), 1, 5).unwrap(),
                Node::in_list(x(), vec![Value::from(1), Value::from(2)]).unwrap(),
                Node::not_in(x(), Node::list([3, 4]).unwrap()).unwrap(),
                Node::not_like(x(), "b%").unwrap(),
                Node::like_ignore_case(x(), "c%").unwrap(),
                Node::not_like_ignore_case(x(), "d%").unwrap(),
                Node::exists(painting_subquery(Some(
                    Node::equal(path("toArtist"), Node::enclosing(Node::path("").unwrap()).unwrap()).unwrap(),
                )))
                .unwrap(),
                Node::not_exists(painting_subquery(None)).unwrap(),
                Node::greater_than(x(), Node::any(painting_subquery(None)).unwrap()).unwrap(),
                Node::less_than(x(), Node::all(painting_subquery(None)).unwrap()).unwrap(),
                Node::true_node(),
                Node::false_node(),
            ])
            .unwrap(),
            call(NodeKind::BitwiseAnd, vec![call(NodeKind::BitwiseNot, vec![x()]), Node::scalar(1)]),
            call(NodeKind::BitwiseOr, vec![x(), Node::scalar(2)]),
            call(NodeKind::BitwiseXor, vec![x(), Node::scalar(3)]),
            call(NodeKind::BitwiseLeftShift, vec![x(), Node::scalar(1)]),
            call(NodeKind::BitwiseRightShift, vec![x(), Node::scalar(1)]),
            call(
                NodeKind::Concat,
                vec![
                    call(NodeKind::Substring, vec![x(), Node::scalar(1), Node::scalar(2)]),
                    call(NodeKind::Trim, vec![x()]),
                    call(NodeKind::Lower, vec![x()]),
                    call(NodeKind::Upper, vec![x()]),
                ],
            ),
            call(
                NodeKind::Add,
                vec![
                    call(NodeKind::Length, vec![x()]),
                    call(NodeKind::Locate, vec![Node::scalar("a"), x()]),
                    call(NodeKind::Abs, vec![x()]),
                    call(NodeKind::Sqrt, vec![x()]),
                    call(NodeKind::Mod, vec![x(), Node::scalar(2)]),
                    call(NodeKind::Extract(DatePart::Year), vec![x()]),
                ],
            ),
            Node::count_all(),
            call(NodeKind::Count, vec![x()]),
            call(NodeKind::Distinct, vec![x()]),
            call(NodeKind::Min, vec![x()]),
            call(NodeKind::Max, vec![x()]),
            call(NodeKind::Avg, vec![x()]),
            call(NodeKind::Sum, vec![x()]),
            call(NodeKind::FunctionCall("soundex".into()), vec![x()]),
            call(NodeKind::CustomOperator("~~".into()), vec![x(), Node::scalar(1)]),
            call(NodeKind::CustomAggregate("median".into()), vec![x()]),
            Node::case_when(
                [(Node::greater_than(x(), 1).unwrap(), Node::scalar("big"))],
                Some(Node::scalar("small")),
            )
            .unwrap(),
            Node::leaf(NodeKind::CurrentDate),
            Node::leaf(NodeKind::CurrentTime),
            Node::leaf(NodeKind::CurrentTimestamp),
        ];

        for tree in &trees {
            assert_reattached_copies_render_alike(tree);
        }
    }
}
