fn main() {
    b3notes::cmd::command_main();
}
