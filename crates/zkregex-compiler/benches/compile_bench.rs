use criterion::{black_box, criterion_group, criterion_main, Criterion};
use halo2_proofs::dev::MockProver;
use halo2curves::pasta::Fp;
use zkregex_compiler::{compile, pad_input, AcceptMode, CircuitConfig, CompileOptions, RegexCircuit};

const PATTERNS: [&str; 4] =
    ["1=(a|b) (2=(b|c)+ )+d", "(mina|MINA)+", "a:[^a-z]+.", "[a-z]+@[a-z]+\\.(com|org)"];

fn benchmark_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for pattern in PATTERNS {
        group.bench_function(pattern, |b| {
            b.iter(|| compile(black_box(pattern), &CompileOptions::default()).unwrap());
        });
    }

    group.finish();
}

fn benchmark_reveal_compile(c: &mut Criterion) {
    let options = CompileOptions::default().reveal_substring("(a|b)").reveal_substring("(b|c)");

    c.bench_function("compile_with_reveals", |b| {
        b.iter(|| compile(black_box("1=(a|b) (2=(b|c)+ )+d"), black_box(&options)).unwrap());
    });
}

fn benchmark_mock_prover(c: &mut Criterion) {
    let mut group = c.benchmark_group("mock_prover_input_scaling");

    let artifact = compile("(mina|MINA)+", &CompileOptions::new(AcceptMode::Count)).unwrap();
    for len in [16, 64, 256] {
        let input = pad_input(b"Amina is dominating with her stamina", len.max(36)).unwrap();
        let config = CircuitConfig::for_artifact(&artifact, input.len());
        let circuit = RegexCircuit::<Fp>::new(artifact.program.clone(), input.len())
            .with_input(&input)
            .unwrap();
        let public = circuit.public_inputs().unwrap();

        group.bench_function(format!("len_{}", input.len()), |b| {
            b.iter(|| {
                let prover =
                    MockProver::run(black_box(config.k), black_box(&circuit), vec![public.clone()])
                        .unwrap();
                black_box(prover.verify())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_compile, benchmark_reveal_compile, benchmark_mock_prover);
criterion_main!(benches);
