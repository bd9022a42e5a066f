use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use go_syntax::lexer::Lexer;
use go_syntax::parse_source;
use goclientgen::config::{GenConfig, GoEnv};
use goclientgen::generate::{generate, GenRequest};
use goclientgen::loader::load_program;
use std::fs;
use std::hint::black_box as bb;
use std::path::Path;

// =============================================================================
// Corpus - a server package with `n` methods over `n` param types
// =============================================================================

fn params_source(n: usize) -> String {
    let mut s = String::from("package params\n\n");
    for i in 0..n {
        s.push_str(&format!(
            "// Req{i} is request {i}.\ntype Req{i} struct {{\n\tID   string `httprequest:\"id,path\"`\n\tBody []byte `httprequest:\",body\"`\n}}\n\n\
             type Resp{i} struct {{\n\tItems map[string][]int\n\tNext  *Resp{i}\n}}\n\n"
        ));
    }
    s
}

fn server_source(n: usize) -> String {
    let mut s = String::from(
        "package server\n\nimport (\n\t\"context\"\n\t\"fmt\"\n\n\t\"example.com/bench/params\"\n)\n\n\
         type Server struct {\n\tBase\n\tname string\n}\n\ntype Base struct{}\n\n\
         func (b *Base) Close() error { return nil }\n\n",
    );
    for i in 0..n {
        s.push_str(&format!(
            "// Method{i} handles request {i}.\n\
             func (s *Server) Method{i}(ctx context.Context, p *params.Req{i}) (*params.Resp{i}, error) {{\n\
             \tif p.ID == \"\" {{\n\t\treturn nil, fmt.Errorf(\"missing id in %d\", {i})\n\t}}\n\
             \treturn &params.Resp{i}{{Items: map[string][]int{{\"a\": {{1, 2}}}}}}, nil\n}}\n\n"
        ));
    }
    s
}

fn write_module(root: &Path, n: usize) {
    let write = |rel: &str, contents: &str| {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    };
    write("go.mod", "module example.com/bench\n\ngo 1.22\n");
    write("params/params.go", &params_source(n));
    write("server/server.go", &server_source(n));
    write("client/client.go", "package client\n");
}

fn env() -> GoEnv {
    GoEnv {
        goos: "linux".into(),
        goarch: "amd64".into(),
        ..GoEnv::default()
    }
}

const SIZES: [usize; 3] = [10, 100, 1000];

// =============================================================================
// Benchmark 1: Front end (lex / parse one file)
// =============================================================================

fn bench_front_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_end");

    for n in SIZES {
        let src = server_source(n);
        group.throughput(Throughput::Bytes(src.len() as u64));

        group.bench_with_input(BenchmarkId::new("lex", n), &src, |b, src| {
            b.iter(|| {
                let mut acc: u64 = 0;
                for (l, _, r) in Lexer::new(bb(src)) {
                    acc = acc.wrapping_add((l ^ r) as u64);
                }
                bb(acc);
            });
        });

        group.bench_with_input(BenchmarkId::new("parse", n), &src, |b, src| {
            b.iter(|| bb(parse_source(bb(src)).is_ok()));
        });
    }

    group.finish();
}

// =============================================================================
// Benchmark 2: Loading and full generation from disk
// =============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    for n in SIZES {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("load", n), dir.path(), |b, root| {
            b.iter(|| bb(load_program(root, env(), "./server").unwrap()));
        });

        let req = GenRequest {
            server_pkg: "example.com/bench/server".into(),
            server_type: "Server".into(),
            client_type: "Client".into(),
            out_dir: "client".into(),
            config: GenConfig::default(),
        };
        group.bench_with_input(BenchmarkId::new("generate", n), dir.path(), |b, root| {
            b.iter_batched(
                || req.clone(),
                |req| bb(generate(root, env(), &req).unwrap().source.len()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_front_end, bench_pipeline);
criterion_main!(benches);
