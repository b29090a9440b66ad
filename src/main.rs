fn main() {
  fable_explorer::run()
}
