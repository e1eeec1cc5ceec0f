use vecmat::{run, Error};

fn run_program(source: &str) -> (Result<(), Error>, String) {
    let mut output = Vec::new();
    let res = run(source, &mut output);
    (res, String::from_utf8(output).expect("Output not utf-8"))
}

fn assert_output(source: &str, expected: &str) {
    let (res, output) = run_program(source);
    if let Err(e) = res {
        panic!("Program failed: {}\n{}", e, source);
    }
    assert_eq!(output, expected, "program:\n{}", source);
}

#[test]
fn vector_addition() {
    assert_output(
        "vector v1 = [1, 2, 3]\n\
         vector v2 = [4, 5, 6]\n\
         vector v3 = v1 + v2\n\
         print(v3)\n",
        "[5, 7, 9]\n",
    );
}

#[test]
fn matrix_multiplication() {
    assert_output(
        "matrix m1 = [[1, 2], [3, 4], [5, 6]]\n\
         matrix m2 = [[5, 6, 7], [7, 8, 9]]\n\
         matrix m3 = m1 * m2\n\
         print(m3)\n",
        "[[19, 22, 25], [43, 50, 57], [67, 78, 89]]\n",
    );
}

#[test]
fn vector_literal_round_trips() {
    let data: Vec<Vec<i64>> = vec![
        vec![0],
        vec![1, 2, 3],
        vec![10, 0, 7, 12345, 9],
        vec![i64::MAX, 0],
    ];

    for elements in data {
        let literal = elements
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let source = format!("vector v = [{}]\nprint(v)", literal);
        assert_output(&source, &format!("[{}]\n", literal));
    }
}

#[test]
fn addition_commutes() {
    let pairs = vec![
        ("[1, 2, 3]", "[4, 5, 6]"),
        ("[0, 0]", "[7, 8]"),
        ("[100]", "[23]"),
    ];

    for (a, b) in pairs {
        let source = format!(
            "vector a = {}\nvector b = {}\nvector x = a + b\nvector y = b + a\nprint(x)\nprint(y)",
            a, b
        );
        let (res, output) = run_program(&source);
        assert!(res.is_ok());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
    }
}

#[test]
fn shape_errors_stop_the_program() {
    let programs = vec![
        "vector a = [1, 2]\nmatrix b = [[1, 2]]\nvector c = a + b\nprint(a)",
        "vector a = [1, 2]\nvector b = [1, 2, 3]\nvector c = a + b\nprint(a)",
        "matrix a = [[1, 2]]\nmatrix b = [[1, 2]]\nmatrix c = a * b\nprint(a)",
    ];

    for source in programs {
        let (res, output) = run_program(source);
        match res {
            Err(Error::Shape { line, .. }) => assert_eq!(line, 3),
            r => panic!("Expected shape error, got {:?}", r),
        }
        assert_eq!(output, "");
    }
}

#[test]
fn undefined_variable() {
    let (res, output) = run_program("vector a = [1]\nvector b = a + c");
    match res {
        Err(e @ Error::UndefinedVariable { .. }) => {
            assert_eq!(e.line(), Some(2));
            assert_eq!(e.to_string(), "Error on line 2: Unknown variable: c");
        }
        r => panic!("Expected undefined variable, got {:?}", r),
    }
    assert_eq!(output, "");
}

#[test]
fn malformed_programs() {
    let programs = vec![
        ("vector a = [1, 2\n\n", 1),
        ("vector a = [1]\nvector b [2]\n", 2),
        ("vector a = [1]\n\n\nmatrix b = [[1], [2]\nprint(a)", 5),
    ];

    for (source, expected_line) in programs {
        let (res, output) = run_program(source);
        match res {
            Err(Error::Syntax { line, .. }) => assert_eq!(line, expected_line, "{}", source),
            r => panic!("Expected syntax error, got {:?}", r),
        }
        assert_eq!(output, "");
    }
}

#[test]
fn long_operator_chains() {
    let mut source = String::from("vector v = [1]\nvector w = v");
    for _ in 0..10_000 {
        source.push_str(" + v");
    }
    source.push_str("\nprint(w)");
    assert_output(&source, "[10001]\n");

    let mut source = String::from("matrix i = [[1, 0], [0, 1]]\nmatrix m = i");
    for _ in 0..10_000 {
        source.push_str(" * i");
    }
    source.push_str("\nprint(m)");
    assert_output(&source, "[[1, 0], [0, 1]]\n");
}

#[test]
fn deep_parentheses() {
    let nested = |depth: usize| {
        format!(
            "vector v = {}[1]{}\nprint(v)",
            "(".repeat(depth),
            ")".repeat(depth)
        )
    };

    assert_output(&nested(32), "[1]\n");

    let (res, output) = run_program(&nested(1000));
    match res {
        Err(Error::Syntax { found, line }) => {
            assert_eq!(found, "'('");
            assert_eq!(line, 1);
        }
        r => panic!("Expected syntax error, got {:?}", r),
    }
    assert_eq!(output, "");
}

#[test]
fn print_is_not_a_variable_name() {
    let (res, output) = run_program("vector print = [1]\nprint(print)");
    match res {
        Err(Error::Syntax { found, line }) => {
            assert_eq!(found, "'vector print'");
            assert_eq!(line, 1);
        }
        r => panic!("Expected syntax error, got {:?}", r),
    }
    assert_eq!(output, "");
}
