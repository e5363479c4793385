#[cfg(test)]
mod tests {
    use orm_expr::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn path(text: &str) -> Node {
        Node::path(text).unwrap()
    }

    fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    // ========================================================================
    // Map and prune
    // ========================================================================

    #[test]
    fn test_identity_transform_copies_tree() {
        let node = Node::and([
            Node::equal(path("a"), 1).unwrap(),
            Node::like(path("b"), "x%").unwrap(),
        ])
        .unwrap();
        let copy = node.transform(|n| Ok(Some(n))).unwrap().unwrap();
        assert_eq!(copy, node);
    }

    #[test]
    fn test_transform_rewrites_leaves() {
        let node = Node::equal(path("a"), 1).unwrap();
        let renamed = node
            .transform(|n| match n.kind() {
                NodeKind::ObjPath(_) => Ok(Some(Node::path("renamed").unwrap())),
                _ => Ok(Some(n)),
            })
            .unwrap()
            .unwrap();
        assert_eq!(renamed.to_string(), "renamed = 1");
        // source untouched
        assert_eq!(node.to_string(), "a = 1");
    }

    #[test]
    fn test_pruned_operand_dropped_from_and() {
        let node = Node::and([
            Node::equal(path("a"), 1).unwrap(),
            Node::equal(path("b"), 2).unwrap(),
            Node::equal(path("c"), 3).unwrap(),
        ])
        .unwrap();

        let pruned = node
            .transform(|n| match n.operand(0).map(Node::kind) {
                Some(NodeKind::ObjPath(p)) if p.to_string() == "b" => Ok(None),
                _ => Ok(Some(n)),
            })
            .unwrap()
            .unwrap();
        assert_eq!(pruned.to_string(), "(a = 1) and (c = 3)");
    }

    #[test]
    fn test_single_survivor_collapses() {
        let node = Node::or([
            Node::equal(path("a"), 1).unwrap(),
            Node::equal(path("b"), 2).unwrap(),
        ])
        .unwrap();

        let pruned = node
            .transform(|n| match n.kind() {
                NodeKind::Equal if n.operand(1).and_then(Node::as_scalar) == Some(&Value::Int(2)) => Ok(None),
                _ => Ok(Some(n)),
            })
            .unwrap()
            .unwrap();
        assert_eq!(pruned.kind(), &NodeKind::Equal);
        assert_eq!(pruned.to_string(), "a = 1");
    }

    #[test]
    fn test_everything_pruned_yields_none() {
        let node = Node::and([
            Node::equal(path("a"), 1).unwrap(),
            Node::equal(path("b"), 2).unwrap(),
        ])
        .unwrap();
        let result = node
            .transform(|n| match n.kind() {
                NodeKind::Equal => Ok(None),
                _ => Ok(Some(n)),
            })
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_pruned_operand_prunes_non_logical_parent() {
        let node = Node::not(Node::equal(path("a"), Node::param("missing")).unwrap()).unwrap();
        let result = node
            .transform(|n| match n.kind() {
                NodeKind::Parameter(_) => Ok(None),
                _ => Ok(Some(n)),
            })
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_transform_error_propagates() {
        let node = Node::equal(path("a"), 1).unwrap();
        let result = node.transform(|n| match n.kind() {
            NodeKind::Scalar(_) => Err(ExpressionError::Unsupported("literal".into())),
            _ => Ok(Some(n)),
        });
        assert!(matches!(result, Err(ExpressionError::Unsupported(_))));
    }

    #[test]
    fn test_transform_flattens_replaced_operands() {
        // replacing a leaf with an AND under an AND yields one flat AND
        let node = Node::and([Node::equal(path("a"), 1).unwrap(), Node::true_node()]).unwrap();
        let result = node
            .transform(|n| match n.kind() {
                NodeKind::True => Ok(Some(
                    Node::and([
                        Node::equal(path("b"), 2).unwrap(),
                        Node::equal(path("c"), 3).unwrap(),
                    ])
                    .unwrap(),
                )),
                _ => Ok(Some(n)),
            })
            .unwrap()
            .unwrap();
        assert_eq!(result.operand_count(), 3);
    }

    #[test]
    fn test_transform_is_idempotent_on_flat_trees() {
        let node = Node::add(Node::add(1, 2).unwrap(), Node::add(3, 4).unwrap()).unwrap();
        let once = node.transform(|n| Ok(Some(n))).unwrap().unwrap();
        let twice = once.transform(|n| Ok(Some(n))).unwrap().unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.operand_count(), 4);
    }

    // ========================================================================
    // Folding
    // ========================================================================

    #[test]
    fn test_in_empty_list_folds_to_false() {
        let node = Node::in_list(path("a"), Vec::<Value>::new()).unwrap();
        let folded = node.transform(|n| Ok(Some(n))).unwrap().unwrap();
        assert_eq!(folded.kind(), &NodeKind::False);

        let not_in = Node::not_in(path("a"), Vec::<Value>::new()).unwrap();
        let folded = not_in.transform(|n| Ok(Some(n))).unwrap().unwrap();
        assert_eq!(folded.kind(), &NodeKind::True);
    }

    #[test]
    fn test_in_list_emptied_by_pruning_folds() {
        let node = Node::in_list(path("a"), Node::list([Node::param("x"), Node::param("y")]).unwrap()).unwrap();
        let bound = node.params(&HashMap::new(), true).unwrap().unwrap();
        assert_eq!(bound.to_string(), "false");
    }

    // ========================================================================
    // Named parameters
    // ========================================================================

    #[test]
    fn test_params_binds_values() {
        let node = Node::and([
            Node::equal(path("artistName"), Node::param("name")).unwrap(),
            Node::greater_than(path("estimatedPrice"), Node::param("price")).unwrap(),
        ])
        .unwrap();

        let bound = node
            .params(
                &values(&[("name", Value::from("Picasso")), ("price", Value::from(5000))]),
                false,
            )
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_string(), "(artistName = \"Picasso\") and (estimatedPrice > 5000)");
        assert!(bound
            .matches(&Value::map([
                ("artistName", Value::from("Picasso")),
                ("estimatedPrice", Value::from(9000)),
            ]))
            .unwrap());
    }

    #[test]
    fn test_params_prunes_missing() {
        let node = Node::and([
            Node::equal(path("artistName"), Node::param("name")).unwrap(),
            Node::greater_than(path("estimatedPrice"), Node::param("price")).unwrap(),
        ])
        .unwrap();

        let bound = node
            .params(&values(&[("price", Value::from(5000))]), true)
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_string(), "estimatedPrice > 5000");
    }

    #[test]
    fn test_params_missing_without_pruning_is_error() {
        let node = Node::equal(path("a"), Node::param("a")).unwrap();
        assert!(matches!(
            node.params(&HashMap::new(), false),
            Err(ExpressionError::MissingParameter(name)) if name == "a"
        ));
    }

    #[test]
    fn test_params_list_value_becomes_list() {
        let node = Node::in_list(path("id"), Node::param("ids")).unwrap();
        let bound = node
            .params(&values(&[("ids", Value::list([1, 2, 3]))]), false)
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_string(), "id in (1, 2, 3)");
    }

    #[test]
    fn test_params_null_value() {
        let node = Node::equal(path("a"), Node::param("a")).unwrap();
        let bound = node.params(&values(&[("a", Value::Null)]), false).unwrap().unwrap();
        assert_eq!(bound.to_string(), "a = null");
    }

    #[test]
    fn test_params_available_keeps_unbound_names() {
        let template = Node::and([
            Node::in_list(path("id"), Node::param("ids")).unwrap(),
            Node::equal(path("name"), Node::param("name")).unwrap(),
        ])
        .unwrap();

        let bound = template
            .params_available(&values(&[("ids", Value::list([1, 2]))]))
            .unwrap()
            .unwrap();

        assert_eq!(bound.to_string(), "(id in (1, 2)) and (name = $name)");
        let list = bound.operand(0).unwrap().operand(1).unwrap();
        assert_eq!(list.kind(), &NodeKind::List);
        assert_eq!(list.operand_count(), 2);
    }

    #[test]
    fn test_params_leaves_template_reusable() {
        let template = Node::equal(path("a"), Node::param("a")).unwrap();
        let first = template.params(&values(&[("a", Value::from(1))]), false).unwrap().unwrap();
        let second = template.params(&values(&[("a", Value::from(2))]), false).unwrap().unwrap();
        assert_eq!(first.to_string(), "a = 1");
        assert_eq!(second.to_string(), "a = 2");
        assert_eq!(template.to_string(), "a = $a");
    }

    // ========================================================================
    // Positional parameters
    // ========================================================================

    #[test]
    fn test_params_array_in_order() {
        let node = Node::and([
            Node::equal(path("a"), Node::param("x")).unwrap(),
            Node::equal(path("b"), Node::param("y")).unwrap(),
        ])
        .unwrap();
        let bound = node
            .params_array(&[Value::from(1), Value::from("two")])
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_string(), "(a = 1) and (b = \"two\")");
    }

    #[test]
    fn test_params_array_repeated_name_reuses_value() {
        let node = Node::or([
            Node::equal(path("a"), Node::param("x")).unwrap(),
            Node::equal(path("b"), Node::param("x")).unwrap(),
            Node::equal(path("c"), Node::param("y")).unwrap(),
        ])
        .unwrap();
        let bound = node
            .params_array(&[Value::from(1), Value::from(2)])
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_string(), "(a = 1) or (b = 1) or (c = 2)");
    }

    #[test]
    fn test_params_array_too_few() {
        let node = Node::and([
            Node::equal(path("a"), Node::param("x")).unwrap(),
            Node::equal(path("b"), Node::param("y")).unwrap(),
        ])
        .unwrap();
        assert!(matches!(
            node.params_array(&[Value::from(1)]),
            Err(ExpressionError::TooFewParameters(1))
        ));
    }

    #[test]
    fn test_params_array_too_many() {
        let node = Node::equal(path("a"), Node::param("x")).unwrap();
        assert!(matches!(
            node.params_array(&[Value::from(1), Value::from(2)]),
            Err(ExpressionError::TooManyParameters { expected: 1, actual: 2 })
        ));
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TraversalHandler for Recorder {
        fn start_node(&mut self, node: &Node, parent: Option<&Node>) {
            let parent = parent.map(|p| p.kind().name()).unwrap_or("-");
            self.events.push(format!("start {} <- {}", node.kind().name(), parent));
        }

        fn finished_child(&mut self, node: &Node, index: usize, has_more_children: bool) {
            self.events.push(format!(
                "child {} #{} more={}",
                node.kind().name(),
                index,
                has_more_children
            ));
        }

        fn end_node(&mut self, node: &Node, _parent: Option<&Node>) {
            self.events.push(format!("end {}", node.kind().name()));
        }
    }

    #[test]
    fn test_traverse_order() {
        let node = Node::not(Node::equal(path("a"), 1).unwrap()).unwrap();
        let mut recorder = Recorder::default();
        node.traverse(&mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                "start NOT <- -",
                "start EQUAL_TO <- NOT",
                "start OBJ_PATH <- EQUAL_TO",
                "end OBJ_PATH",
                "child EQUAL_TO #0 more=true",
                "start SCALAR <- EQUAL_TO",
                "end SCALAR",
                "child EQUAL_TO #1 more=false",
                "end EQUAL_TO",
                "child NOT #0 more=false",
                "end NOT",
            ]
        );
    }

    #[test]
    fn test_traverse_counts_parameters() {
        struct ParamCounter(usize);
        impl TraversalHandler for ParamCounter {
            fn start_node(&mut self, node: &Node, _parent: Option<&Node>) {
                if matches!(node.kind(), NodeKind::Parameter(_)) {
                    self.0 += 1;
                }
            }
        }

        let node = Node::and([
            Node::equal(path("a"), Node::param("x")).unwrap(),
            Node::between(path("b"), Node::param("lo"), Node::param("hi")).unwrap(),
        ])
        .unwrap();
        let mut counter = ParamCounter(0);
        node.traverse(&mut counter);
        assert_eq!(counter.0, 3);
    }
}
